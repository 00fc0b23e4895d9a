use crate::MeshError;
use crate::mesh::{MeshCommand, MeshSnapshot};
use tokio::sync::{mpsc, oneshot};

/// Cloneable front end of a running [`crate::mesh::Mesh`]. Dropping every handle
/// stops the mesh.
#[derive(Debug, Clone)]
pub struct MeshHandle {
    tx: mpsc::Sender<MeshCommand>,
}

impl MeshHandle {
    pub(crate) fn new(tx: mpsc::Sender<MeshCommand>) -> Self {
        Self { tx }
    }

    pub async fn send_chat(&self, body: impl Into<String>) -> Result<(), MeshError> {
        self.send(MeshCommand::SendChat { body: body.into() }).await
    }

    pub async fn set_chat_open(&self, open: bool) -> Result<(), MeshError> {
        self.send(MeshCommand::SetChatOpen(open)).await
    }

    pub async fn snapshot(&self) -> Result<MeshSnapshot, MeshError> {
        let (tx, rx) = oneshot::channel();
        self.send(MeshCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| MeshError::Closed)
    }

    pub async fn leave(&self) -> Result<(), MeshError> {
        self.send(MeshCommand::Leave).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, cmd: MeshCommand) -> Result<(), MeshError> {
        self.tx.send(cmd).await.map_err(|_| MeshError::Closed)
    }
}
