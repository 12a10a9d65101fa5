pub mod extended;
pub mod segment;

// Re-export commonly used types
pub use extended::{unwrap_all, ExtendedValue};
pub use segment::{Segment, SimTime};
