pub mod signature;
pub mod transport;
