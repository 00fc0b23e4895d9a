use meshcall_client::negotiation::NegotiationState;
use meshcall_core::{SessionDescription, SignalPayload};

use crate::integration::init_tracing;
use crate::utils::{TestMesh, TransportCall, pid};

#[tokio::test]
async fn test_rejected_description_tears_down_only_that_peer() {
    init_tracing();

    let mesh = TestMesh::start("a").await;
    mesh.joined("a", &["a"]).await;
    mesh.joined("b", &["a", "b"]).await;
    mesh.joined("c", &["a", "b", "c"]).await;
    assert!(mesh.wait_until(|s| s.peers.len() == 2, 2000).await);

    mesh.transports.reject_remote_descriptions(&pid("b"));
    mesh.signal("b", &SignalPayload::Sdp(SessionDescription::answer("bad")))
        .await;

    assert!(mesh.wait_for_absent("b", 2000).await);
    assert!(mesh.observer.wait_for_closed(&pid("b"), 1000).await);
    assert_eq!(mesh.transports.count(&pid("b"), &TransportCall::Close), 1);

    mesh.signal("c", &SignalPayload::Sdp(SessionDescription::answer("v=0")))
        .await;
    assert!(
        mesh.wait_for_state("c", NegotiationState::Stable, 2000)
            .await
    );
}
