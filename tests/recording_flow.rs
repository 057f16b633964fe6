//! Recording lifecycle driven over the link, including forced stops.

use camlink::telemetry::SyntheticTelemetry;
use camlink::testing::{MemoryNotifications, SyntheticCapture, SyntheticEncoder};
use camlink::transport::Rendezvous;
use camlink::{
    CamlinkConfig, CameraDevice, RemoteController, RemoteEvent, StatusEvent, StatusSnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn fast_config() -> CamlinkConfig {
    let mut config = CamlinkConfig::default();
    config.connection.connect_timeout_secs = 1;
    config.connection.heartbeat_interval_secs = 1;
    config.connection.liveness_check_interval_ms = 100;
    config.telemetry.broadcast_interval_ms = 200;
    config.telemetry.battery_interval_ms = 500;
    config.telemetry.temperature_interval_ms = 500;
    config.recording.tick_interval_ms = 200;
    config
}

struct Link {
    device: CameraDevice,
    remote: RemoteController,
    encoder: Arc<SyntheticEncoder>,
}

async fn paired_link() -> Link {
    let rendezvous = Rendezvous::new();
    let encoder = Arc::new(SyntheticEncoder::new());
    let device = CameraDevice::with_rendezvous(
        fast_config(),
        Arc::new(SyntheticCapture::new()),
        encoder.clone(),
        Arc::new(MemoryNotifications::new()),
        Box::new(SyntheticTelemetry::new()),
        rendezvous.clone(),
    );
    let remote = RemoteController::with_rendezvous(
        fast_config(),
        Arc::new(MemoryNotifications::new()),
        rendezvous,
    );
    let code = device.pairing_code();
    let waiter = {
        let device = device.clone();
        tokio::spawn(async move { device.wait_for_remote().await })
    };
    remote.connect(&code).await.unwrap();
    waiter.await.unwrap().unwrap();
    Link {
        device,
        remote,
        encoder,
    }
}

async fn wait_for_status(
    rx: &mut broadcast::Receiver<RemoteEvent>,
    want: StatusEvent,
) -> StatusSnapshot {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Ok(RemoteEvent::Status { event, state })) if event == want => return state,
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => panic!("event stream ended: {}", e),
            Err(_) => panic!("timed out waiting for {:?}", want),
        }
    }
}

#[tokio::test]
async fn test_remote_start_and_stop() {
    let link = paired_link().await;
    let mut events = link.remote.events();

    link.remote.start_recording().unwrap();
    let state = wait_for_status(&mut events, StatusEvent::RecordingStarted).await;
    assert!(state.is_recording);
    assert!(link.device.is_recording());
    assert!(link.encoder.is_active());
    assert!(link.remote.mirror().is_recording);

    link.remote.stop_recording().unwrap();
    let state = wait_for_status(&mut events, StatusEvent::RecordingStopped).await;
    assert!(!state.is_recording);
    assert!(!link.device.is_recording());
    assert!(!link.encoder.is_active());
    assert!(!link.remote.mirror().is_recording);
    assert_eq!(link.encoder.sessions(), 1);
}

#[tokio::test]
async fn test_backgrounding_forces_stop_and_broadcasts() {
    let link = paired_link().await;
    let mut events = link.remote.events();

    link.remote.start_recording().unwrap();
    wait_for_status(&mut events, StatusEvent::RecordingStarted).await;

    // The device app loses visibility mid-recording.
    link.device.enter_background();
    let state = wait_for_status(&mut events, StatusEvent::RecordingStopped).await;
    assert!(!state.is_recording);
    assert!(!link.device.is_recording());
    assert!(!link.encoder.is_active());
    assert!(!link.remote.mirror().is_recording);
}

#[tokio::test]
async fn test_backgrounding_while_idle_is_a_no_op() {
    let link = paired_link().await;
    link.device.enter_background();
    assert!(!link.device.is_recording());
    assert!(link.device.is_connected());
    assert_eq!(link.encoder.sessions(), 0);
}

#[tokio::test]
async fn test_double_start_keeps_original_session() {
    let link = paired_link().await;
    let mut events = link.remote.events();

    link.remote.start_recording().unwrap();
    wait_for_status(&mut events, StatusEvent::RecordingStarted).await;

    // A second start is rejected by the camera and the session survives.
    link.remote.start_recording().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(link.device.is_recording());
}

#[tokio::test]
async fn test_duration_reaches_remote_mirror() {
    let link = paired_link().await;
    let mut events = link.remote.events();

    link.remote.start_recording().unwrap();
    wait_for_status(&mut events, StatusEvent::RecordingStarted).await;

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert!(link.device.recording_elapsed_secs() >= 1);
    assert!(link.remote.mirror().recording_duration >= 1);
}
