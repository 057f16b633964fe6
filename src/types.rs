//! Core shared types for the camera link
//!
//! Device state, video settings, status events, and stop reasons. Serde
//! renames keep the wire representation camelCase while the Rust side stays
//! snake_case.

use serde::{Deserialize, Serialize};

/// Video quality presets exposed to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "4k")]
    Uhd4k,
}

impl VideoQuality {
    /// Capture resolution for this preset as (width, height).
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            VideoQuality::Hd720 => (1280, 720),
            VideoQuality::Hd1080 => (1920, 1080),
            VideoQuality::Uhd4k => (3840, 2160),
        }
    }
}

impl std::fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoQuality::Hd720 => write!(f, "720p"),
            VideoQuality::Hd1080 => write!(f, "1080p"),
            VideoQuality::Uhd4k => write!(f, "4k"),
        }
    }
}

/// Which camera the device is capturing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Rear camera.
    Environment,
    /// Front camera.
    User,
}

impl CameraFacing {
    pub fn flipped(&self) -> Self {
        match self {
            CameraFacing::Environment => CameraFacing::User,
            CameraFacing::User => CameraFacing::Environment,
        }
    }
}

/// Full camera device state.
///
/// The camera endpoint is the only writer. The remote holds a mirror that
/// is updated exclusively from status and telemetry messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub battery_level: f32,
    pub battery_charging: bool,
    /// Degrees Fahrenheit.
    pub temperature: f32,
    pub zoom: f32,
    pub quality: VideoQuality,
    pub frame_rate: u32,
    pub camera_facing: CameraFacing,
    pub flash_on: bool,
    pub grid_visible: bool,
    pub storage_available: String,
    pub signal_strength: u8,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            battery_level: 85.0,
            battery_charging: false,
            temperature: 72.0,
            zoom: 1.0,
            quality: VideoQuality::Hd1080,
            frame_rate: 30,
            camera_facing: CameraFacing::Environment,
            flash_on: false,
            grid_visible: false,
            storage_available: "30GB".to_string(),
            signal_strength: 85,
        }
    }
}

/// Named events carried by status broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    RecordingStarted,
    RecordingStopped,
    CameraFlipped,
    ZoomChanged,
    QualityChanged,
    FramerateChanged,
    FlashToggled,
    GridToggled,
    TelemetryUpdate,
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusEvent::RecordingStarted => "recording_started",
            StatusEvent::RecordingStopped => "recording_stopped",
            StatusEvent::CameraFlipped => "camera_flipped",
            StatusEvent::ZoomChanged => "zoom_changed",
            StatusEvent::QualityChanged => "quality_changed",
            StatusEvent::FramerateChanged => "framerate_changed",
            StatusEvent::FlashToggled => "flash_toggled",
            StatusEvent::GridToggled => "grid_toggled",
            StatusEvent::TelemetryUpdate => "telemetry_update",
        };
        write!(f, "{}", name)
    }
}

/// Why a recording session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Explicit stop command or local stop.
    Requested,
    /// The device app lost foreground visibility.
    Backgrounded,
    /// The channel to the peer went away.
    Disconnected,
    /// The capture collaborator failed mid-recording.
    CameraError,
}

/// Severity attached to user-facing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}
