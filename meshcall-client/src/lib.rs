pub mod chat;
pub mod media;
pub mod mesh;
pub mod negotiation;
pub mod signaling;
pub mod transport;

mod config;
mod error;
mod session;

pub use config::*;
pub use error::*;
pub use session::*;
