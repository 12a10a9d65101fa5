use crate::cosim::transport::Endpoint;
use crate::core::errors::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default size of the receive buffer, in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 256;

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

/// Connection and phasing of one cosimulation bridge
///
/// `offset` is the number of firings by which the send half leads
/// (negative) or the receive half leads (positive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub endpoint: Endpoint,
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl BridgeConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            offset: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn tcp(host: &str, port: u16) -> Self {
        Self::new(Endpoint::Tcp {
            host: host.to_string(),
            port,
        })
    }

    pub fn pipe(to_peer: impl Into<PathBuf>, from_peer: impl Into<PathBuf>) -> Self {
        Self::new(Endpoint::Pipe {
            to_peer: to_peer.into(),
            from_peer: from_peer.into(),
        })
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(SimError::Config("bridge buffer_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
