pub mod adapters;
pub mod transport;
