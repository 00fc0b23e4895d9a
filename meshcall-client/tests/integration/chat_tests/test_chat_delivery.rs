use meshcall_client::signaling::SignalingEvent;
use meshcall_core::ChatMessage;

use crate::integration::init_tracing;
use crate::utils::{TestMesh, pid};

#[tokio::test]
async fn test_send_reaches_open_channels_and_always_records() {
    init_tracing();

    let mesh = TestMesh::start("alice").await;
    mesh.joined("alice", &["alice"]).await;
    mesh.joined("b", &["alice", "b"]).await;
    mesh.joined("c", &["alice", "b", "c"]).await;
    assert!(mesh.wait_until(|s| s.peers.len() == 2, 2000).await);

    // only b's channel ever opens
    let to_b = mesh.transports.open_chat(&pid("b")).await;
    assert!(mesh.observer.wait_for_established(&pid("b"), 1000).await);

    mesh.handle.send_chat("hi all").await.unwrap();
    assert!(mesh.wait_until(|s| s.timeline.len() == 1, 2000).await);

    assert_eq!(to_b.sent(), vec![r#"{"sender":"alice","body":"hi all"}"#.to_owned()]);

    let snapshot = mesh.snapshot().await;
    let entry = &snapshot.timeline[0];
    assert!(entry.is_local());
    assert_eq!(entry.message, ChatMessage::new("alice", "hi all"));
    assert_eq!(snapshot.unread, 0);
}

#[tokio::test]
async fn test_send_with_closed_channel_stays_local() {
    init_tracing();

    let mesh = TestMesh::start("alice").await;
    mesh.joined("alice", &["alice"]).await;
    mesh.joined("b", &["alice", "b"]).await;
    assert!(mesh.wait_until(|s| s.peers.len() == 1, 2000).await);

    let to_b = mesh.transports.open_chat(&pid("b")).await;
    assert!(mesh.observer.wait_for_established(&pid("b"), 1000).await);
    to_b.set_open(false);

    mesh.handle.send_chat("anyone?").await.unwrap();
    assert!(mesh.wait_until(|s| s.timeline.len() == 1, 2000).await);
    assert!(to_b.sent().is_empty());
    assert_eq!(mesh.snapshot().await.unread, 0);
}

#[tokio::test]
async fn test_relayed_chat_joins_the_timeline() {
    init_tracing();

    let mesh = TestMesh::start("alice").await;
    mesh.joined("alice", &["alice"]).await;

    mesh.send(SignalingEvent::ChatMessage {
        from: pid("b"),
        sender: "bob".into(),
        body: "through the relay".into(),
    })
    .await;
    // echo of our own message
    mesh.send(SignalingEvent::ChatMessage {
        from: pid("alice"),
        sender: "alice".into(),
        body: "echo".into(),
    })
    .await;

    assert!(mesh.wait_until(|s| !s.timeline.is_empty(), 2000).await);
    let snapshot = mesh.snapshot().await;
    assert_eq!(snapshot.timeline.len(), 1);
    assert_eq!(snapshot.timeline[0].from, Some(pid("b")));
    assert_eq!(snapshot.timeline[0].message.body, "through the relay");
    assert_eq!(snapshot.unread, 1);
}
