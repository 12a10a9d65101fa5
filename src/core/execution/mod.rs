pub mod config;
pub mod dataflow_engine;
pub mod execution_order;
pub mod lockstep_engine;
pub mod simulation_engine;

// Re-export commonly used types
pub use config::{ConcurrencyMode, SimulationConfig};
pub use execution_order::ExecutionOrderBuilder;
pub use simulation_engine::{ProcessStatus, RunReport, SimulationEngine};
