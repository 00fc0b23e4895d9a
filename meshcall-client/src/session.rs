use crate::media::LocalMedia;
use crate::mesh::{Mesh, MeshHandle, MeshObserver};
use crate::signaling::WsSignaling;
use crate::transport::WebRtcTransportFactory;
use crate::{MeshConfig, MeshError};
use std::sync::Arc;
use tracing::info;

/// Connects to the relay, spawns the mesh task on the current runtime and
/// returns its handle.
pub async fn join_call(
    config: MeshConfig,
    media: &LocalMedia,
    observer: Arc<dyn MeshObserver>,
) -> Result<MeshHandle, MeshError> {
    let (signaling, events) =
        WsSignaling::connect(&config.signaling_url, config.event_buffer.max(1)).await?;
    let transports = WebRtcTransportFactory::new(config.transport.clone());

    info!(room = %config.room, name = %config.display_name, "starting call");
    let (mesh, handle) = Mesh::new(
        config,
        Arc::new(signaling),
        events,
        Arc::new(transports),
        media.subscribe(),
        observer,
    );
    tokio::spawn(mesh.run());
    Ok(handle)
}
