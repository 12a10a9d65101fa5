//! Cosimulation: bridging processes to out-of-process peers.

pub mod bridge;
pub mod config;
pub mod relay;
pub mod transport;
pub mod wire;

pub use bridge::{sdf_bridge, sy_bridge, Phase, SdfBridge, SyBridge};
pub use config::BridgeConfig;
pub use transport::{Endpoint, PipeTransport, TcpTransport, Transport};
