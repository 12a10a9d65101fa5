//! Ordered single-producer/single-consumer channels and the typed ports
//! bound to them.

use crate::core::errors::ChannelError;
use crate::core::types::{ChannelId, PortSpec};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Buffering discipline of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMode {
    /// At most one pending value; used by the synchronous MoC
    SingleSlot,
    /// Logically unbounded FIFO; used by dataflow and continuous time
    Unbounded,
}

struct ChannelState<T> {
    queue: VecDeque<T>,
    written: u64,
    consumed: u64,
}

/// An ordered queue with exactly one writer and one reader.
///
/// Cloning a `Channel` clones the handle, not the content.
pub struct Channel<T> {
    id: ChannelId,
    name: Arc<str>,
    mode: ChannelMode,
    state: Arc<Mutex<ChannelState<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            mode: self.mode,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

impl<T: fmt::Debug> Channel<T> {
    pub(crate) fn new(id: ChannelId, name: &str, mode: ChannelMode) -> Self {
        Self {
            id,
            name: Arc::from(name),
            mode,
            state: Arc::new(Mutex::new(ChannelState {
                queue: VecDeque::new(),
                written: 0,
                consumed: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    /// Append a value. A single-slot channel rejects a write while its
    /// previous value is still pending.
    pub fn write(&self, value: T) -> Result<(), ChannelError> {
        let mut state = self.lock();
        if self.mode == ChannelMode::SingleSlot {
            if let Some(pending) = state.queue.front() {
                return Err(ChannelError::Overflow {
                    channel: self.name.to_string(),
                    pending: format!("{:?}", pending),
                });
            }
        }
        state.queue.push_back(value);
        state.written += 1;
        Ok(())
    }

    /// Remove and return the oldest value.
    ///
    /// The engines only fire a process once its input rates are satisfied,
    /// so an empty read here means the firing rule was bypassed.
    pub fn read(&self) -> Result<T, ChannelError> {
        let mut state = self.lock();
        match state.queue.pop_front() {
            Some(value) => {
                state.consumed += 1;
                Ok(value)
            }
            None => Err(ChannelError::Empty {
                channel: self.name.to_string(),
            }),
        }
    }

    /// Number of unread values (non-blocking)
    pub fn size(&self) -> usize {
        self.lock().queue.len()
    }

    /// Total number of values ever written
    pub fn written(&self) -> u64 {
        self.lock().written
    }

    /// Total number of values ever consumed
    pub fn consumed(&self) -> u64 {
        self.lock().consumed
    }
}

impl<T: Clone + fmt::Debug> Channel<T> {
    /// Copy of the unread values, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().queue.iter().cloned().collect()
    }

    /// Copy of the oldest unread value, left in place
    pub fn peek(&self) -> Option<T> {
        self.lock().queue.front().cloned()
    }
}

/// Typed input endpoint bound to exactly one channel
#[derive(Debug, Clone)]
pub struct InPort<T> {
    name: String,
    rate: usize,
    channel: Channel<T>,
}

impl<T: fmt::Debug> InPort<T> {
    pub fn new(name: &str, channel: &Channel<T>, rate: usize) -> Self {
        Self {
            name: name.to_string(),
            rate,
            channel: channel.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rate(&self) -> usize {
        self.rate
    }

    pub fn spec(&self) -> PortSpec {
        PortSpec::input(&self.name, self.channel.id(), self.rate)
    }

    /// Whether enough tokens are queued for one firing
    pub fn satisfied(&self) -> bool {
        self.channel.size() >= self.rate
    }

    pub fn available(&self) -> usize {
        self.channel.size()
    }

    pub fn read(&self) -> Result<T, ChannelError> {
        self.channel.read()
    }

    /// Read exactly `rate` tokens
    pub fn read_rate(&self) -> Result<Vec<T>, ChannelError> {
        self.read_n(self.rate)
    }

    pub fn read_n(&self, n: usize) -> Result<Vec<T>, ChannelError> {
        (0..n).map(|_| self.channel.read()).collect()
    }
}

impl<T: Clone + fmt::Debug> InPort<T> {
    pub fn peek(&self) -> Option<T> {
        self.channel.peek()
    }
}

/// Typed output endpoint bound to exactly one channel
#[derive(Debug, Clone)]
pub struct OutPort<T> {
    name: String,
    rate: usize,
    channel: Channel<T>,
}

impl<T: fmt::Debug> OutPort<T> {
    pub fn new(name: &str, channel: &Channel<T>, rate: usize) -> Self {
        Self {
            name: name.to_string(),
            rate,
            channel: channel.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rate(&self) -> usize {
        self.rate
    }

    pub fn spec(&self) -> PortSpec {
        PortSpec::output(&self.name, self.channel.id(), self.rate)
    }

    pub fn write(&self, value: T) -> Result<(), ChannelError> {
        self.channel.write(value)
    }

    pub fn write_all<I: IntoIterator<Item = T>>(&self, values: I) -> Result<(), ChannelError> {
        for value in values {
            self.channel.write(value)?;
        }
        Ok(())
    }
}
