//! Error types for camlink
//!
//! One crate-wide error enum covering pairing, transport, protocol,
//! recording, and capture failures. Protocol-level errors are recoverable:
//! callers log and drop the offending message. Channel-level errors end the
//! channel instance but never the process.

use thiserror::Error;

/// Why a capture collaborator could not provide the camera.
///
/// Mirrors the platform error classes a capture backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFailure {
    /// User or OS denied camera access.
    PermissionDenied,
    /// No camera hardware present.
    NotFound,
    /// Requested capture mode unsupported by the hardware.
    NotSupported,
}

impl std::fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureFailure::PermissionDenied => write!(f, "permission-denied"),
            CaptureFailure::NotFound => write!(f, "not-found"),
            CaptureFailure::NotSupported => write!(f, "not-supported"),
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum CamlinkError {
    /// No peer registered under the code within the connect timeout.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The pairing code was retired by a refresh before connect.
    #[error("Pairing code is stale; ask the camera for its current code")]
    StaleCode,

    /// A pairing code that is not exactly six ASCII digits.
    #[error("Invalid pairing code: {0}")]
    InvalidCode(String),

    /// Send or receive attempted on a channel that is not open.
    #[error("Channel is not open")]
    ChannelNotOpen,

    /// Inbound bytes that do not decode to a known wire message.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The capture collaborator refused to provide the camera.
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(CaptureFailure),

    /// start requested while a recording is already active.
    #[error("Recording already active")]
    RecordingAlreadyActive,

    /// stop requested while no recording is active.
    #[error("No recording active")]
    RecordingNotActive,

    /// Configuration file could not be read, parsed, or written.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CamlinkError {
    /// True for errors that leave the channel usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CamlinkError::MalformedMessage(_)
                | CamlinkError::RecordingAlreadyActive
                | CamlinkError::RecordingNotActive
                | CamlinkError::InvalidCode(_)
        )
    }
}

impl From<serde_json::Error> for CamlinkError {
    fn from(err: serde_json::Error) -> Self {
        CamlinkError::MalformedMessage(err.to_string())
    }
}
