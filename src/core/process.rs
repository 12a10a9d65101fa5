//! The five-phase process life cycle shared by every model of computation.
//!
//! Every process is driven through `init`, then any number of firings of
//! `prepare` → `execute` → `produce`, then `clean`. The engines decide *when*
//! a process fires from its [`Readiness`]; the process decides *what* a firing
//! consumes and emits.

use crate::core::errors::{Result, SimError};
use crate::core::types::{PortSpec, ProcessId};
use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};

/// Firing rule verdict for the next firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// All input requirements are met
    Ready,
    /// Waiting for tokens on at least one input
    Waiting,
    /// Permanently suspended (e.g. a bounded source ran out)
    Exhausted,
}

/// A process (actor) of a network.
pub trait Process: Send {
    /// Unique process name
    fn name(&self) -> &str;

    /// Constructor kind, e.g. `"sy::comb"`
    fn kind(&self) -> &'static str;

    /// Ports with the channels they are bound to
    fn ports(&self) -> Vec<PortSpec>;

    /// Whether the process output of a firing does not depend on the inputs
    /// of the same firing (delay-like). Such processes break feedback cycles.
    fn holds_state(&self) -> bool {
        false
    }

    /// One-time setup
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Firing rule check (non-blocking)
    fn readiness(&self) -> Readiness;

    /// Read the tokens of one firing
    fn prepare(&mut self) -> Result<()>;

    /// Apply the user function; no channel I/O
    fn execute(&mut self) -> Result<()>;

    /// Write the results of one firing
    fn produce(&mut self) -> Result<()>;

    /// One-time teardown
    fn clean(&mut self) -> Result<()> {
        Ok(())
    }

    /// Constructor arguments, for introspection observers
    fn arguments(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn id(&self) -> ProcessId {
        ProcessId::new(self.name(), self.kind())
    }
}

/// Optional observer notified once per process when the network initialises.
pub trait ProcessObserver: Send {
    fn on_init(&mut self, id: &ProcessId, ports: &[PortSpec], arguments: &[(String, String)]);
}

/// Run a user function, turning a panic into [`SimError::Execution`] that
/// names the process and the offending input.
pub(crate) fn guarded<I, R, F>(process: &str, input: &I, f: F) -> Result<R>
where
    I: Debug + ?Sized,
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| SimError::Execution {
        process: process.to_string(),
        value: format!("{:?}", input),
        reason: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "user function panicked".to_string()
    }
}

/// Check that a user function returned the declared token count.
pub(crate) fn check_rate<T>(process: &str, port: &str, expected: usize, values: &[T]) -> Result<()> {
    if values.len() != expected {
        return Err(SimError::RateMismatch {
            process: process.to_string(),
            port: port.to_string(),
            expected,
            got: values.len(),
        });
    }
    Ok(())
}
