mod deadline;
mod mesh;
mod mesh_command;
mod mesh_handle;
mod mesh_observer;
mod peer_handle;
mod registry;

pub use deadline::*;
pub use mesh::*;
pub use mesh_command::*;
pub use mesh_handle::*;
pub use mesh_observer::*;
pub use peer_handle::*;
pub use registry::*;
