//! Collaborator traits for hardware and UI concerns
//!
//! The link layer never touches real camera hardware, encoders, QR
//! scanners, or UI surfaces. Those live behind these traits; the crate
//! ships synthetic implementations in [`crate::testing`] and applications
//! plug in real ones.

use crate::errors::CamlinkError;
use crate::types::{CameraFacing, Severity, VideoQuality};

/// What the device asks its capture backend for.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub quality: VideoQuality,
    pub frame_rate: u32,
    pub facing: CameraFacing,
}

/// Supplies the live camera feed.
///
/// `acquire` failures map platform error classes to
/// [`crate::errors::CaptureFailure`].
pub trait CaptureProvider: Send + Sync {
    fn acquire(&self, request: &CaptureRequest) -> Result<(), CamlinkError>;
    fn release(&self);
}

/// Consumes the feed while a recording is active.
pub trait RecordingEncoder: Send + Sync {
    fn start_encoding(&self, quality: VideoQuality, frame_rate: u32) -> Result<(), CamlinkError>;
    fn stop_encoding(&self);
}

/// Reads a pairing payload from a displayed code.
pub trait CodeScanner: Send + Sync {
    /// Returns the raw scanned payload, e.g. `CAMERA_CONNECT:482913`.
    fn scan(&self) -> Result<String, CamlinkError>;
}

/// Receives user-facing notifications from either endpoint.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Notification sink that only logs.
#[derive(Debug, Default)]
pub struct LogNotifications;

impl NotificationSink for LogNotifications {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Warning | Severity::Error => log::warn!("{}", message),
            _ => log::info!("{}", message),
        }
    }
}
