//! Process constructors, one module per model of computation.

pub mod ct;
pub mod sadf;
pub mod sdf;
pub mod shared;
pub mod sy;
