use meshcall_client::negotiation::NegotiationState;
use meshcall_client::transport::TransportEvent;
use meshcall_core::{IceCandidate, SdpType, SessionDescription, SignalPayload};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestMesh, TransportCall, pid};

async fn offering_mesh() -> TestMesh {
    let mesh = TestMesh::start("a").await;
    mesh.joined("a", &["a"]).await;
    mesh.joined("b", &["a", "b"]).await;
    assert!(
        mesh.wait_for_state("b", NegotiationState::OfferSent, 2000)
            .await
    );
    mesh
}

#[tokio::test]
async fn test_offerer_reaches_stable_on_answer() {
    init_tracing();

    let mesh = offering_mesh().await;
    mesh.signal("b", &SignalPayload::Ice(IceCandidate::new("candidate:early")))
        .await;
    mesh.signal("b", &SignalPayload::Sdp(SessionDescription::answer("v=0")))
        .await;

    assert!(
        mesh.wait_for_state("b", NegotiationState::Stable, 2000)
            .await
    );

    let calls = mesh.transports.calls_for(&pid("b"));
    let set_remote = calls
        .iter()
        .position(|c| *c == TransportCall::SetRemoteDescription(SdpType::Answer))
        .expect("answer applied");
    let candidate = calls
        .iter()
        .position(|c| *c == TransportCall::AddIceCandidate("candidate:early".into()))
        .expect("queued candidate applied");
    assert!(set_remote < candidate);
}

#[tokio::test]
async fn test_duplicate_answer_is_ignored() {
    init_tracing();

    let mesh = offering_mesh().await;
    for _ in 0..3 {
        mesh.signal("b", &SignalPayload::Sdp(SessionDescription::answer("v=0")))
            .await;
    }
    assert!(
        mesh.wait_for_state("b", NegotiationState::Stable, 2000)
            .await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        mesh.transports.count(
            &pid("b"),
            &TransportCall::SetRemoteDescription(SdpType::Answer)
        ),
        1
    );
    assert_eq!(
        mesh.snapshot().await.peer(&pid("b")).unwrap().state,
        NegotiationState::Stable
    );
}

#[tokio::test]
async fn test_local_candidates_trickle_immediately() {
    init_tracing();

    let mesh = offering_mesh().await;
    mesh.transports
        .emit(&pid("b"), |key| {
            TransportEvent::CandidateGenerated(key, IceCandidate::new("candidate:local"))
        })
        .await;

    assert!(mesh.signaling.wait_for_relays(&pid("b"), 2, 2000).await);
    let relays = mesh.signaling.relays_to(&pid("b")).await;
    assert_eq!(
        relays[1],
        SignalPayload::Ice(IceCandidate::new("candidate:local"))
    );
}
