use meshcall_client::media::{LocalMedia, LocalTrack, TrackSource};
use meshcall_core::MediaKind;

use crate::integration::init_tracing;
use crate::utils::{TestMesh, TransportCall, pid, test_config};

#[tokio::test]
async fn test_screen_share_end_falls_back_to_camera() {
    init_tracing();

    let camera = LocalTrack::capture(MediaKind::Video, TrackSource::Camera);
    let camera_id = camera.id().to_owned();
    let media = LocalMedia::new(
        Some(camera),
        Some(LocalTrack::capture(MediaKind::Audio, TrackSource::Microphone)),
    );
    let mut mesh = TestMesh::start_with("a", test_config("a"), media).await;
    mesh.joined("a", &["a"]).await;
    mesh.joined("b", &["a", "b"]).await;
    assert!(mesh.wait_until(|s| s.peer(&pid("b")).is_some(), 2000).await);

    let screen = LocalTrack::capture(MediaKind::Video, TrackSource::Screen);
    let screen_id = screen.id().to_owned();
    mesh.media.start_screen_share(screen, None);
    assert!(
        mesh.transports
            .wait_for_call(
                &pid("b"),
                &TransportCall::ReplaceTrack(MediaKind::Video, screen_id),
                1,
                2000
            )
            .await,
        "peer should receive the screen"
    );

    mesh.media.screen_share_ended();
    assert!(
        mesh.transports
            .wait_for_call(
                &pid("b"),
                &TransportCall::ReplaceTrack(MediaKind::Video, camera_id),
                1,
                2000
            )
            .await,
        "peer should be back on the camera"
    );
    assert_eq!(mesh.transports.count(&pid("b"), &TransportCall::CreateOffer), 1);
}
