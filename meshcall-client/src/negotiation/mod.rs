mod negotiation;
mod role;

pub use negotiation::*;
pub use role::*;
