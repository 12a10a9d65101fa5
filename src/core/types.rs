use serde::{Deserialize, Serialize};

/// Process identifier with constructor kind information
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId {
    pub(crate) name: String,
    pub(crate) kind: String,
}

impl ProcessId {
    /// Create a new process ID
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Get the unique process name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the constructor kind, e.g. `"sdf::comb"`
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Identifier of a channel inside one network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub(crate) usize);

impl ChannelId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Port specification: a named endpoint bound to one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name
    pub name: String,
    pub direction: PortDirection,
    /// Channel the port is bound to
    pub channel: ChannelId,
    /// Tokens consumed/produced per firing (1 outside dataflow)
    pub rate: usize,
}

impl PortSpec {
    /// Create a new input port spec
    pub fn input(name: &str, channel: ChannelId, rate: usize) -> Self {
        Self {
            name: name.to_string(),
            direction: PortDirection::Input,
            channel,
            rate,
        }
    }

    /// Create a new output port spec
    pub fn output(name: &str, channel: ChannelId, rate: usize) -> Self {
        Self {
            name: name.to_string(),
            direction: PortDirection::Output,
            channel,
            rate,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

/// Models of computation supported by the engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Moc {
    /// Lock-step synchronous
    Synchronous,
    /// Static-rate dataflow
    Dataflow,
    /// Continuous time, sampled as function segments
    ContinuousTime,
}

impl std::fmt::Display for Moc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Moc::Synchronous => write!(f, "SY"),
            Moc::Dataflow => write!(f, "SDF"),
            Moc::ContinuousTime => write!(f, "CT"),
        }
    }
}
