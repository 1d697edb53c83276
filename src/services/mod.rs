pub mod codec;
pub mod directory;
pub mod dispatcher;
pub mod dissemination;
pub mod presence;
pub mod transport;
