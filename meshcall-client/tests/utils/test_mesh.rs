use meshcall_client::MeshConfig;
use meshcall_client::media::LocalMedia;
use meshcall_client::mesh::{Mesh, MeshHandle, MeshSnapshot};
use meshcall_client::negotiation::NegotiationState;
use meshcall_client::signaling::SignalingEvent;
use meshcall_core::{ParticipantId, SignalPayload};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::utils::{MockSignalingOutput, MockTransportFactory, RecordingObserver, SignalRecord};

pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::from(id)
}

pub fn test_config(display_name: &str) -> MeshConfig {
    MeshConfig::new("ws://unused", "test-room", display_name)
}

/// A mesh running on mocks, driven by hand-crafted signaling events.
pub struct TestMesh {
    pub id: ParticipantId,
    pub handle: MeshHandle,
    pub signaling: MockSignalingOutput,
    pub signaling_tx: mpsc::Sender<SignalingEvent>,
    pub transports: MockTransportFactory,
    pub observer: RecordingObserver,
    pub media: LocalMedia,
    /// Frames the mesh sent to the relay, for routing between meshes.
    pub outbound: Option<mpsc::UnboundedReceiver<SignalRecord>>,
}

impl TestMesh {
    /// Start a mesh and connect it as `id`.
    pub async fn start(id: &str) -> Self {
        Self::start_with(id, test_config(id), LocalMedia::without_devices()).await
    }

    pub async fn start_with(id: &str, config: MeshConfig, media: LocalMedia) -> Self {
        let (signaling, outbound) = MockSignalingOutput::new();
        let (signaling_tx, signaling_rx) = mpsc::channel(64);
        let transports = MockTransportFactory::new();
        let observer = RecordingObserver::new();

        let (mesh, handle) = Mesh::new(
            config,
            Arc::new(signaling.clone()),
            signaling_rx,
            Arc::new(transports.clone()),
            media.subscribe(),
            Arc::new(observer.clone()),
        );
        tokio::spawn(mesh.run());

        let test_mesh = Self {
            id: pid(id),
            handle,
            signaling,
            signaling_tx,
            transports,
            observer,
            media,
            outbound: Some(outbound),
        };
        test_mesh.send(SignalingEvent::Connected(pid(id))).await;
        assert!(
            test_mesh.wait_until(|s| s.self_id.is_some(), 1000).await,
            "mesh never learned its id"
        );
        test_mesh
    }

    pub async fn send(&self, event: SignalingEvent) {
        self.signaling_tx.send(event).await.expect("mesh stopped");
    }

    pub async fn joined(&self, newcomer: &str, roster: &[&str]) {
        self.send(SignalingEvent::ParticipantJoined {
            id: pid(newcomer),
            roster: roster.iter().map(|id| pid(id)).collect(),
        })
        .await;
    }

    pub async fn left(&self, id: &str) {
        self.send(SignalingEvent::ParticipantLeft(pid(id))).await;
    }

    pub async fn signal(&self, from: &str, payload: &SignalPayload) {
        self.raw_signal(from, &payload.encode().expect("encodable payload"))
            .await;
    }

    pub async fn raw_signal(&self, from: &str, payload: &str) {
        self.send(SignalingEvent::Signal {
            from: pid(from),
            payload: payload.to_owned(),
        })
        .await;
    }

    pub async fn snapshot(&self) -> MeshSnapshot {
        self.handle.snapshot().await.expect("mesh stopped")
    }

    /// Poll snapshots until `pred` holds.
    pub async fn wait_until<F>(&self, pred: F, timeout_ms: u64) -> bool
    where
        F: Fn(&MeshSnapshot) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Ok(snapshot) = self.handle.snapshot().await {
                if pred(&snapshot) {
                    return true;
                }
            }
            if tokio::time::Instant::now() > deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_state(&self, peer: &str, state: NegotiationState, timeout_ms: u64) -> bool {
        let peer = pid(peer);
        self.wait_until(
            |s| s.peer(&peer).is_some_and(|p| p.state == state),
            timeout_ms,
        )
        .await
    }

    pub async fn wait_for_absent(&self, peer: &str, timeout_ms: u64) -> bool {
        let peer = pid(peer);
        self.wait_until(|s| s.peer(&peer).is_none(), timeout_ms)
            .await
    }
}
