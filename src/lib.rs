pub mod core;
pub mod cosim;
pub mod moc;

// Re-export commonly used types
pub use crate::core::builder::Network;
pub use crate::core::channel::{Channel, ChannelMode, InPort, OutPort};
pub use crate::core::errors::{AbsentValueError, ChannelError, Result, SimError};
pub use crate::core::execution::{ConcurrencyMode, ProcessStatus, RunReport, SimulationConfig, SimulationEngine};
pub use crate::core::process::{Process, ProcessObserver, Readiness};
pub use crate::core::types::{ChannelId, Moc, PortDirection, PortSpec, ProcessId};
pub use crate::core::values::{ExtendedValue, Segment, SimTime};
