use meshcall_client::media::LocalMedia;
use meshcall_client::negotiation::NegotiationState;
use meshcall_core::{SessionDescription, SignalPayload};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestMesh, TransportCall, pid, test_config};

#[tokio::test(start_paused = true)]
async fn test_stalled_negotiation_fails_after_timeout() {
    init_tracing();

    let mesh = TestMesh::start("a").await;
    mesh.joined("a", &["a"]).await;
    mesh.joined("b", &["a", "b"]).await;
    assert!(
        mesh.wait_for_state("b", NegotiationState::OfferSent, 2000)
            .await
    );

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(mesh.snapshot().await.peer(&pid("b")).is_some());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(mesh.wait_for_absent("b", 1000).await, "stalled handle should fail");
    assert!(mesh.observer.has_closed(&pid("b")).await);
    assert_eq!(mesh.transports.count(&pid("b"), &TransportCall::Close), 1);
}

#[tokio::test(start_paused = true)]
async fn test_completed_negotiation_survives_timeout() {
    init_tracing();

    let mesh = TestMesh::start("a").await;
    mesh.joined("a", &["a"]).await;
    mesh.joined("b", &["a", "b"]).await;
    mesh.signal("b", &SignalPayload::Sdp(SessionDescription::answer("v=0")))
        .await;
    assert!(
        mesh.wait_for_state("b", NegotiationState::Stable, 2000)
            .await
    );

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        mesh.snapshot().await.peer(&pid("b")).unwrap().state,
        NegotiationState::Stable
    );
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_disables_the_deadline() {
    init_tracing();

    let mut config = test_config("a");
    config.negotiation_timeout_ms = 0;
    let mesh = TestMesh::start_with("a", config, LocalMedia::without_devices()).await;
    mesh.joined("a", &["a"]).await;
    mesh.joined("b", &["a", "b"]).await;
    assert!(
        mesh.wait_for_state("b", NegotiationState::OfferSent, 2000)
            .await
    );

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(mesh.snapshot().await.peer(&pid("b")).is_some());
}
