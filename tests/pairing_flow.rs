//! End-to-end pairing flow between a camera device and a remote control.

use camlink::telemetry::SyntheticTelemetry;
use camlink::testing::{MemoryNotifications, SyntheticCapture, SyntheticEncoder, SyntheticScanner};
use camlink::transport::Rendezvous;
use camlink::{
    CamlinkConfig, CameraDevice, CamlinkError, CaptureFailure, ConnectionState, RemoteController,
    RemoteEvent, StatusEvent, StatusSnapshot,
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

struct Harness {
    rendezvous: Rendezvous,
    device: CameraDevice,
    remote: RemoteController,
    capture: Arc<SyntheticCapture>,
}

fn harness() -> Harness {
    let rendezvous = Rendezvous::new();
    let capture = Arc::new(SyntheticCapture::new());
    let device = CameraDevice::with_rendezvous(
        fast_config(),
        capture.clone(),
        Arc::new(SyntheticEncoder::new()),
        Arc::new(MemoryNotifications::new()),
        Box::new(SyntheticTelemetry::new()),
        rendezvous.clone(),
    );
    let remote = RemoteController::with_rendezvous(
        fast_config(),
        Arc::new(MemoryNotifications::new()),
        rendezvous.clone(),
    );
    Harness {
        rendezvous,
        device,
        remote,
        capture,
    }
}

async fn pair(h: &Harness) {
    let code = h.device.pairing_code();
    let waiter = {
        let device = h.device.clone();
        tokio::spawn(async move { device.wait_for_remote().await })
    };
    h.remote.connect(&code).await.unwrap();
    waiter.await.unwrap().unwrap();
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
async fn test_pair_and_set_zoom() {
    let h = harness();
    let mut events = h.remote.events();
    pair(&h).await;

    assert!(h.device.is_connected());
    assert!(h.remote.is_connected());
    assert!(h.capture.is_acquired());

    h.remote.set_zoom(2.0).unwrap();
    let state = wait_for_status(&mut events, StatusEvent::ZoomChanged).await;
    assert_eq!(state.zoom, 2.0);
    assert_eq!(h.remote.mirror().zoom, 2.0);
    assert_eq!(h.device.device_state().zoom, 2.0);
}

#[tokio::test]
async fn test_out_of_range_zoom_is_clamped_by_camera() {
    let h = harness();
    let mut events = h.remote.events();
    pair(&h).await;

    h.remote.set_zoom(42.0).unwrap();
    let state = wait_for_status(&mut events, StatusEvent::ZoomChanged).await;
    assert_eq!(state.zoom, 5.0);
    assert_eq!(h.remote.mirror().zoom, 5.0);
}

#[tokio::test]
async fn test_stale_code_rejected_fresh_code_connects() {
    let h = harness();
    let old = h.device.pairing_code();
    let fresh = h.device.refresh_pairing_code();
    assert_ne!(old.as_str(), fresh.as_str());

    let waiter = {
        let device = h.device.clone();
        tokio::spawn(async move { device.wait_for_remote().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = h.remote.connect(&old).await.unwrap_err();
    assert!(matches!(err, CamlinkError::StaleCode));
    assert_eq!(h.remote.connection_state(), ConnectionState::Disconnected);

    // A fresh controller dials the fresh code successfully.
    let remote = RemoteController::with_rendezvous(
        fast_config(),
        Arc::new(MemoryNotifications::new()),
        h.rendezvous.clone(),
    );
    remote.connect(&fresh).await.unwrap();
    waiter.await.unwrap().unwrap();
    assert!(h.device.is_connected());
}

#[tokio::test]
async fn test_unknown_code_times_out() {
    let h = harness();
    let bogus = camlink::PairingCode::parse("000001").unwrap();
    let start = std::time::Instant::now();
    let err = h.remote.connect(&bogus).await.unwrap_err();
    assert!(matches!(err, CamlinkError::ConnectionFailed(_)));
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_connect_by_scan() {
    let h = harness();
    let scanner = SyntheticScanner::new(h.device.scan_payload());
    let waiter = {
        let device = h.device.clone();
        tokio::spawn(async move { device.wait_for_remote().await })
    };
    h.remote.connect_by_scan(&scanner).await.unwrap();
    waiter.await.unwrap().unwrap();
    assert!(h.remote.is_connected());
}

#[tokio::test]
async fn test_capture_failure_is_surfaced_to_the_user() {
    let notes = Arc::new(MemoryNotifications::new());
    let device = CameraDevice::with_rendezvous(
        fast_config(),
        Arc::new(SyntheticCapture::failing(CaptureFailure::PermissionDenied)),
        Arc::new(SyntheticEncoder::new()),
        notes.clone(),
        Box::new(SyntheticTelemetry::new()),
        Rendezvous::new(),
    );
    let err = device.wait_for_remote().await.unwrap_err();
    assert!(matches!(
        err,
        CamlinkError::CaptureUnavailable(CaptureFailure::PermissionDenied)
    ));
    assert!(notes.contains("Capture unavailable"));
}

#[tokio::test]
async fn test_scan_payload_with_wrong_prefix_is_invalid() {
    let h = harness();
    let scanner = SyntheticScanner::new("OTHER_APP:123456");
    let err = h.remote.connect_by_scan(&scanner).await.unwrap_err();
    assert!(matches!(err, CamlinkError::InvalidCode(_)));
}
