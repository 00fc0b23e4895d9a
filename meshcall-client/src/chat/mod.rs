mod chat_channel;
mod chat_overlay;

pub use chat_channel::*;
pub use chat_overlay::*;
