//! End-to-end demo: pair a camera and remote in one process and drive a
//! short session from the remote.

use anyhow::Result;
use camlink::capture::LogNotifications;
use camlink::telemetry::SyntheticTelemetry;
use camlink::testing::{SyntheticCapture, SyntheticEncoder};
use camlink::{CamlinkConfig, CameraDevice, RemoteController};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = CamlinkConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;

    let device = CameraDevice::new(
        config.clone(),
        Arc::new(SyntheticCapture::new()),
        Arc::new(SyntheticEncoder::new()),
        Arc::new(LogNotifications),
        Box::new(SyntheticTelemetry::new()),
    );
    let remote = RemoteController::new(config, Arc::new(LogNotifications));

    let code = device.pairing_code();
    println!("Pairing code: {}  (scan payload {})", code, device.scan_payload());

    let waiter = {
        let device = device.clone();
        tokio::spawn(async move { device.wait_for_remote().await })
    };
    remote.connect(&code).await?;
    waiter.await??;
    println!("Paired.");

    remote.set_zoom(2.0)?;
    remote.start_recording()?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    remote.stop_recording()?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mirror = remote.mirror();
    println!(
        "Mirror: zoom {:.1}x, battery {:.1}%, temperature {:.1}F, recording {}",
        mirror.zoom, mirror.battery_level, mirror.temperature, mirror.is_recording
    );

    remote.disconnect();
    device.disconnect();
    Ok(())
}
