pub mod balance;
pub mod topology;

pub use balance::repetition_vector;
pub use topology::{ChannelBinding, Endpoint, ProcessShape, Topology, TopologyValidator};
