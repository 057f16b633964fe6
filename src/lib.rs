//! Camlink: peer-to-peer pairing and remote control for camera devices
//!
//! One endpoint acts as the camera, the other as its remote control. The
//! camera displays a six digit pairing code; the remote dials it and the
//! two sides share an ordered reliable channel carrying JSON command,
//! status, and telemetry messages.
//!
//! - The camera owns the authoritative [`state::DeviceStateStore`] and the
//!   [`recording::RecordingSession`]; the remote holds a read-only mirror
//!   fed by broadcasts.
//! - Heartbeats flow every 5 seconds; silence for twice that marks the
//!   peer dead and tears the link down on both sides.
//! - Hardware, encoding, scanning, and UI live behind the traits in
//!   [`capture`], so the whole pipeline runs offline with the synthetic
//!   implementations in [`testing`].
//!
//! # Usage
//! ```rust,ignore
//! use camlink::{CameraDevice, RemoteController};
//!
//! let device = CameraDevice::new(config, capture, encoder, notifications, telemetry);
//! let code = device.pairing_code();
//! // hand `code` to the remote out of band, then:
//! device.wait_for_remote().await?;
//! remote.connect(&code).await?;
//! remote.set_zoom(2.0)?;
//! ```

pub mod capture;
pub mod config;
pub mod connection;
pub mod device;
pub mod errors;
pub mod invariant_ppt;
pub mod pairing;
pub mod protocol;
pub mod recording;
pub mod remote;
pub mod state;
pub mod telemetry;
pub mod transport;
pub mod types;

// Testing utilities - synthetic collaborators for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::CamlinkConfig;
pub use connection::ConnectionState;
pub use device::CameraDevice;
pub use errors::{CamlinkError, CaptureFailure};
pub use pairing::{PairingCode, PairingCodeGenerator};
pub use protocol::{Command, Message, StatusSnapshot, TelemetryUpdate};
pub use remote::{RemoteController, RemoteEvent};
pub use state::{DeviceStateStore, MirrorState};
pub use types::{CameraFacing, DeviceState, StatusEvent, StopReason, VideoQuality};

/// Initialize logging for the library (useful in tests and demos)
pub fn init_logging() {
    let _ = env_logger::try_init();
}
