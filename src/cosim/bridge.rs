//! Processes that proxy their firings to an external peer.
//!
//! The send half serialises the tokens of one firing and writes them to the
//! transport in `prepare`; the receive half reads one message in `produce`
//! and parses the declared number of output tokens from it. The signed offset
//! decides which halves run in a firing and decays by one per firing until
//! both halves run every time.

use crate::cosim::config::BridgeConfig;
use crate::cosim::transport::Transport;
use crate::cosim::wire::{decode_tokens, encode_groups, MessageReader};
use crate::core::channel::{Channel, InPort, OutPort};
use crate::core::errors::{Result, SimError};
use crate::core::process::{Process, Readiness};
use crate::core::types::PortSpec;
use crate::core::values::ExtendedValue;
use log::{debug, info};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use uuid::Uuid;

/// Relative phase of the send and receive halves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    offset: i64,
}

impl Phase {
    pub fn new(offset: i64) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn sends(&self) -> bool {
        self.offset <= 0
    }

    pub fn receives(&self) -> bool {
        self.offset >= 0
    }

    /// Move one firing closer to lock-step
    pub fn advance(&mut self) {
        if self.offset < 0 {
            self.offset += 1;
        } else if self.offset > 0 {
            self.offset -= 1;
        }
    }
}

/// Runtime state of a connected bridge
struct Session {
    id: Uuid,
    transport: Box<dyn Transport>,
    reader: MessageReader,
}

impl Session {
    fn open(process: &str, kind: &str, config: &BridgeConfig) -> Result<Self> {
        let transport = config.endpoint.open().map_err(|e| SimError::Transport {
            process: process.to_string(),
            reason: format!("cannot connect to {}: {}", config.endpoint, e),
        })?;
        let id = Uuid::new_v4();
        info!("[{} {}] session {} connected to {}", kind, process, id, transport.peer());
        Ok(Self {
            id,
            transport,
            reader: MessageReader::new(config.buffer_size),
        })
    }

    fn send(&mut self, process: &str, message: &str) -> Result<()> {
        debug!("[{} session {}] sending {:?}", process, self.id, message);
        self.transport
            .send(message.as_bytes())
            .map_err(|e| SimError::transport(process, e))
    }

    fn receive<T: FromStr>(&mut self, process: &str, expected: usize) -> Result<Vec<T>> {
        let raw = self
            .reader
            .read_message(self.transport.as_mut())
            .map_err(|e| SimError::transport(process, e))?;
        debug!("[{} session {}] received {:?}", process, self.id, raw);
        decode_tokens(process, &raw, expected)
    }
}

fn session_mut<'a>(session: &'a mut Option<Session>, process: &str) -> Result<&'a mut Session> {
    session
        .as_mut()
        .ok_or_else(|| SimError::transport(process, "bridge is not connected"))
}

fn close(session: &mut Option<Session>, kind: &str, process: &str) {
    if let Some(session) = session.take() {
        info!("[{} {}] session {} closed", kind, process, session.id);
    }
}

/// Dataflow bridge: rated input groups out, one rated output group back
pub struct SdfBridge<I, O> {
    name: String,
    config: BridgeConfig,
    inputs: Vec<InPort<I>>,
    output: OutPort<O>,
    phase: Phase,
    session: Option<Session>,
}

/// Bridge a dataflow process to an external peer.
///
/// Each input is paired with its rate; the peer must answer with at least
/// `output.1` tokens per message.
pub fn sdf_bridge<I, O>(
    name: &str,
    config: BridgeConfig,
    inputs: &[(&Channel<I>, usize)],
    output: (&Channel<O>, usize),
) -> Result<SdfBridge<I, O>>
where
    I: Debug,
    O: Debug,
{
    config.validate()?;
    if inputs.is_empty() {
        return Err(SimError::Config(format!("{}: a bridge needs at least one input group", name)));
    }
    Ok(SdfBridge {
        name: name.to_string(),
        phase: Phase::new(config.offset),
        config,
        inputs: inputs
            .iter()
            .enumerate()
            .map(|(i, (ch, rate))| InPort::new(&format!("i{}", i + 1), ch, *rate))
            .collect(),
        output: OutPort::new("o1", output.0, output.1),
        session: None,
    })
}

impl<I, O> SdfBridge<I, O> {
    pub fn offset(&self) -> i64 {
        self.phase.offset()
    }
}

impl<I, O> Process for SdfBridge<I, O>
where
    I: Display + Debug + Send + 'static,
    O: FromStr + Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sdf::bridge"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports: Vec<PortSpec> = self.inputs.iter().map(|p| p.spec()).collect();
        ports.push(self.output.spec());
        ports
    }

    fn init(&mut self) -> Result<()> {
        self.session = Some(Session::open(&self.name, self.kind(), &self.config)?);
        Ok(())
    }

    fn readiness(&self) -> Readiness {
        if !self.phase.sends() || self.inputs.iter().all(|p| p.satisfied()) {
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
    }

    fn prepare(&mut self) -> Result<()> {
        if !self.phase.sends() {
            return Ok(());
        }
        let groups = self
            .inputs
            .iter()
            .map(|p| p.read_rate())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SimError::channel(&self.name, e))?;
        let message = encode_groups(&groups);
        session_mut(&mut self.session, &self.name)?.send(&self.name, &message)
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        if self.phase.receives() {
            let expected = self.output.rate();
            let tokens: Vec<O> = session_mut(&mut self.session, &self.name)?.receive(&self.name, expected)?;
            self.output
                .write_all(tokens)
                .map_err(|e| SimError::channel(&self.name, e))?;
        }
        self.phase.advance();
        Ok(())
    }

    fn clean(&mut self) -> Result<()> {
        close(&mut self.session, "sdf::bridge", &self.name);
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![
            ("endpoint".to_string(), self.config.endpoint.to_string()),
            ("offset".to_string(), self.config.offset.to_string()),
        ]
    }
}

/// Synchronous bridge: one token per input out, one token back per step
///
/// In steps where the receive half does not run the output is absent. In
/// steps where the send half does not run the inputs are still consumed.
pub struct SyBridge<I, O> {
    name: String,
    config: BridgeConfig,
    inputs: Vec<InPort<ExtendedValue<I>>>,
    output: OutPort<ExtendedValue<O>>,
    phase: Phase,
    session: Option<Session>,
    ivals: Vec<ExtendedValue<I>>,
}

pub fn sy_bridge<I, O>(
    name: &str,
    config: BridgeConfig,
    inputs: &[&Channel<ExtendedValue<I>>],
    output: &Channel<ExtendedValue<O>>,
) -> Result<SyBridge<I, O>>
where
    I: Debug,
    O: Debug,
{
    config.validate()?;
    if inputs.is_empty() {
        return Err(SimError::Config(format!("{}: a bridge needs at least one input", name)));
    }
    Ok(SyBridge {
        name: name.to_string(),
        phase: Phase::new(config.offset),
        config,
        inputs: inputs
            .iter()
            .enumerate()
            .map(|(i, ch)| InPort::new(&format!("i{}", i + 1), ch, 1))
            .collect(),
        output: OutPort::new("o1", output, 1),
        session: None,
        ivals: Vec::new(),
    })
}

impl<I, O> Process for SyBridge<I, O>
where
    I: Display + Debug + Send + 'static,
    O: FromStr + Debug + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sy::bridge"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports: Vec<PortSpec> = self.inputs.iter().map(|p| p.spec()).collect();
        ports.push(self.output.spec());
        ports
    }

    fn init(&mut self) -> Result<()> {
        self.session = Some(Session::open(&self.name, self.kind(), &self.config)?);
        Ok(())
    }

    fn readiness(&self) -> Readiness {
        if self.inputs.iter().all(|p| p.satisfied()) {
            Readiness::Ready
        } else {
            Readiness::Waiting
        }
    }

    fn prepare(&mut self) -> Result<()> {
        self.ivals = self
            .inputs
            .iter()
            .map(|p| p.read())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| SimError::channel(&self.name, e))?;
        if !self.phase.sends() {
            return Ok(());
        }
        let groups = std::mem::take(&mut self.ivals)
            .into_iter()
            .map(|v| v.into_option().map(|x| vec![x]))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SimError::absent(&self.name))?;
        let message = encode_groups(&groups);
        session_mut(&mut self.session, &self.name)?.send(&self.name, &message)
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }

    fn produce(&mut self) -> Result<()> {
        let value = if self.phase.receives() {
            let mut tokens: Vec<O> = session_mut(&mut self.session, &self.name)?.receive(&self.name, 1)?;
            tokens.pop().map(ExtendedValue::Present).unwrap_or_default()
        } else {
            ExtendedValue::Absent
        };
        self.output.write(value).map_err(|e| SimError::channel(&self.name, e))?;
        self.phase.advance();
        Ok(())
    }

    fn clean(&mut self) -> Result<()> {
        close(&mut self.session, "sy::bridge", &self.name);
        Ok(())
    }

    fn arguments(&self) -> Vec<(String, String)> {
        vec![
            ("endpoint".to_string(), self.config.endpoint.to_string()),
            ("offset".to_string(), self.config.offset.to_string()),
        ]
    }
}
