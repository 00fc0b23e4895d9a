use bytes::Bytes;
use meshcall_client::negotiation::NegotiationState;
use meshcall_client::transport::TransportEvent;
use meshcall_core::{IceCandidate, SessionDescription, SignalPayload};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestMesh, TransportCall, pid};

#[tokio::test]
async fn test_leave_closes_handle_and_stops_relays() {
    init_tracing();

    let mesh = TestMesh::start("a").await;
    mesh.joined("a", &["a"]).await;
    mesh.joined("b", &["a", "b"]).await;
    assert!(
        mesh.wait_for_state("b", NegotiationState::OfferSent, 2000)
            .await
    );

    mesh.left("b").await;
    assert!(mesh.wait_for_absent("b", 2000).await, "handle should be gone");
    assert!(mesh.observer.wait_for_closed(&pid("b"), 1000).await);
    assert_eq!(mesh.transports.count(&pid("b"), &TransportCall::Close), 1);

    let relays_before = mesh.signaling.relays_to(&pid("b")).await.len();

    // late traffic from the departed peer
    mesh.signal("b", &SignalPayload::Sdp(SessionDescription::answer("late")))
        .await;
    mesh.signal("b", &SignalPayload::Sdp(SessionDescription::offer("late")))
        .await;
    mesh.signal("b", &SignalPayload::Ice(IceCandidate::new("candidate:9")))
        .await;
    mesh.transports
        .emit(&pid("b"), |key| {
            TransportEvent::CandidateGenerated(key, IceCandidate::new("candidate:1"))
        })
        .await;
    mesh.transports
        .emit(&pid("b"), |key| {
            TransportEvent::Message(key, Bytes::from_static(br#"{"sender":"b","body":"ghost"}"#))
        })
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = mesh.snapshot().await;
    assert!(snapshot.peer(&pid("b")).is_none());
    assert!(snapshot.timeline.is_empty());
    assert_eq!(
        mesh.signaling.relays_to(&pid("b")).await.len(),
        relays_before
    );
    assert_eq!(mesh.observer.last_roster().await, Some(vec![pid("a")]));
}

#[tokio::test]
async fn test_leave_for_unknown_peer_is_harmless() {
    init_tracing();

    let mesh = TestMesh::start("a").await;
    mesh.joined("a", &["a"]).await;
    mesh.left("zzz").await;

    let snapshot = mesh.snapshot().await;
    assert!(snapshot.peers.is_empty());
    assert!(!mesh.observer.has_closed(&pid("zzz")).await);
}
