/// Configuration for simulation execution
///
/// This module provides configuration types for controlling how a network is
/// driven, including concurrency settings and run bounds.
use crate::core::errors::{Result, SimError};
use serde::{Deserialize, Serialize};

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Sequential execution mode - processes are fired in order within a single thread
    #[default]
    Sequential,
    /// Parallel execution mode using Rayon - independent processes of one
    /// synchronous step can be fired concurrently
    Rayon,
}

/// Configuration for simulation execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// The concurrency mode to use for execution
    pub concurrency_mode: ConcurrencyMode,
    /// The size of the thread pool for parallel execution
    /// Only relevant when concurrency_mode is Rayon
    pub thread_pool_size: Option<usize>,
    /// Upper bound on global steps (synchronous) or scheduling rounds
    /// (dataflow, continuous time); `None` runs until quiescence
    pub max_steps: Option<u64>,
    /// Stop a dataflow run at the first halted process instead of letting
    /// the rest of the network continue
    pub halt_on_error: bool,
}

impl SimulationConfig {
    /// Create a new simulation configuration with default values
    ///
    /// Default configuration uses Sequential mode, no step bound and lets
    /// dataflow networks continue past a halted process.
    pub fn new() -> Self {
        Self {
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
            max_steps: None,
            halt_on_error: false,
        }
    }

    /// Set the concurrency mode for the simulation
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    ///
    /// # Note
    /// This setting only affects execution when concurrency_mode is Rayon
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn with_halt_on_error(mut self, halt: bool) -> Self {
        self.halt_on_error = halt;
        self
    }

    /// Reject settings the engines cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.thread_pool_size == Some(0) {
            return Err(SimError::Config("thread_pool_size must be at least 1".to_string()));
        }
        if self.max_steps == Some(0) {
            return Err(SimError::Config("max_steps must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
