pub mod builder;
pub mod channel;
pub mod connections;
pub mod errors;
pub mod execution;
pub mod process;
pub mod types;
pub mod values;
