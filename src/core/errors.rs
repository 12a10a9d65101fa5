//! Error taxonomy of the simulation kernel.

use thiserror::Error;

/// Kernel result type
pub type Result<T> = std::result::Result<T, SimError>;

/// Raised when an absent token is unwrapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("attempted to unwrap an absent value")]
pub struct AbsentValueError;

/// Channel-level failures, reported without process context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel '{channel}' overflow: pending value {pending} not yet consumed")]
    Overflow { channel: String, pending: String },

    #[error("channel '{channel}' is empty")]
    Empty { channel: String },
}

/// Errors surfaced by processes, the network builder and the engines.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("[{process}] {source}")]
    AbsentValue {
        process: String,
        #[source]
        source: AbsentValueError,
    },

    #[error("[{process}] {source}")]
    Channel {
        process: String,
        #[source]
        source: ChannelError,
    },

    #[error("[{process}] expected {expected} tokens from peer, got {got}: {raw:?}")]
    Underflow {
        process: String,
        expected: usize,
        got: usize,
        raw: String,
    },

    #[error("[{process}] cannot decode token {token:?} in {raw:?}")]
    Decode {
        process: String,
        token: String,
        raw: String,
    },

    #[error("[{process}] transport error: {reason}")]
    Transport { process: String, reason: String },

    #[error("[{process}] cannot open '{path}': {reason}")]
    ResourceOpen {
        process: String,
        path: String,
        reason: String,
    },

    #[error("[{process}] function failed on {value}: {reason}")]
    Execution {
        process: String,
        value: String,
        reason: String,
    },

    #[error("[{process}] port '{port}' declared {expected} tokens, function produced {got}")]
    RateMismatch {
        process: String,
        port: String,
        expected: usize,
        got: usize,
    },

    #[error("topology error: {0}")]
    Topology(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SimError {
    /// Name of the process the error originates from, if any.
    pub fn process(&self) -> Option<&str> {
        match self {
            SimError::AbsentValue { process, .. }
            | SimError::Channel { process, .. }
            | SimError::Underflow { process, .. }
            | SimError::Decode { process, .. }
            | SimError::Transport { process, .. }
            | SimError::ResourceOpen { process, .. }
            | SimError::Execution { process, .. }
            | SimError::RateMismatch { process, .. } => Some(process),
            SimError::Topology(_) | SimError::Config(_) => None,
        }
    }

    pub(crate) fn channel(process: &str, source: ChannelError) -> Self {
        SimError::Channel {
            process: process.to_string(),
            source,
        }
    }

    pub(crate) fn absent(process: &str) -> Self {
        SimError::AbsentValue {
            process: process.to_string(),
            source: AbsentValueError,
        }
    }

    pub(crate) fn transport(process: &str, err: impl std::fmt::Display) -> Self {
        SimError::Transport {
            process: process.to_string(),
            reason: err.to_string(),
        }
    }
}
