pub mod mock_chat_channel;
pub mod relay_hub;
pub mod test_mesh;

pub use mock_chat_channel::*;
pub use mock_observer::*;
pub use mock_signaling::*;
pub use mock_transport::*;
pub use relay_hub::*;
pub use test_mesh::*;
