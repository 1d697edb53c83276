pub mod directory;
pub mod transport;
