//! Synthetic collaborators for offline testing
//!
//! Drop-in implementations of the hardware and UI traits that record what
//! was asked of them. Everything here works without a camera, a display,
//! or a network.

use crate::capture::{
    CaptureProvider, CaptureRequest, CodeScanner, NotificationSink, RecordingEncoder,
};
use crate::errors::{CamlinkError, CaptureFailure};
use crate::telemetry::TelemetrySource;
use crate::types::{Severity, VideoQuality};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Capture provider that succeeds, or fails with a configured cause.
#[derive(Debug, Default)]
pub struct SyntheticCapture {
    fail_with: Option<CaptureFailure>,
    acquired: AtomicBool,
    acquire_calls: AtomicUsize,
}

impl SyntheticCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capture provider whose `acquire` always fails.
    pub fn failing(cause: CaptureFailure) -> Self {
        Self {
            fail_with: Some(cause),
            ..Default::default()
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }
}

impl CaptureProvider for SyntheticCapture {
    fn acquire(&self, _request: &CaptureRequest) -> Result<(), CamlinkError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(cause) = self.fail_with {
            return Err(CamlinkError::CaptureUnavailable(cause));
        }
        self.acquired.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.acquired.store(false, Ordering::SeqCst);
    }
}

/// Encoder that counts sessions instead of encoding.
#[derive(Debug, Default)]
pub struct SyntheticEncoder {
    active: AtomicBool,
    sessions: AtomicUsize,
}

impl SyntheticEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

impl RecordingEncoder for SyntheticEncoder {
    fn start_encoding(&self, _quality: VideoQuality, _frame_rate: u32) -> Result<(), CamlinkError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_encoding(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Scanner that returns a fixed payload.
#[derive(Debug)]
pub struct SyntheticScanner {
    payload: String,
}

impl SyntheticScanner {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl CodeScanner for SyntheticScanner {
    fn scan(&self) -> Result<String, CamlinkError> {
        Ok(self.payload.clone())
    }
}

/// Notification sink that remembers every message.
#[derive(Debug, Default)]
pub struct MemoryNotifications {
    entries: Mutex<Vec<(String, Severity)>>,
}

impl MemoryNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, Severity)> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(m, _)| m.contains(needle))
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(&self, message: &str, severity: Severity) {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((message.to_string(), severity));
    }
}

/// Deterministic telemetry: fixed drain/charge rates, constant temperature.
#[derive(Debug, Default)]
pub struct SteadyTelemetry;

impl TelemetrySource for SteadyTelemetry {
    fn next_battery(&mut self, current: f32, recording: bool) -> f32 {
        if recording {
            current - 0.1
        } else {
            current
        }
    }

    fn next_temperature(&mut self, current: f32, _recording: bool) -> f32 {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CameraFacing;

    #[test]
    fn test_synthetic_capture_tracks_acquisition() {
        let capture = SyntheticCapture::new();
        let request = CaptureRequest {
            quality: VideoQuality::Hd1080,
            frame_rate: 30,
            facing: CameraFacing::Environment,
        };
        capture.acquire(&request).unwrap();
        assert!(capture.is_acquired());
        capture.release();
        assert!(!capture.is_acquired());
        assert_eq!(capture.acquire_calls(), 1);
    }

    #[test]
    fn test_failing_capture_reports_cause() {
        let capture = SyntheticCapture::failing(CaptureFailure::NotFound);
        let request = CaptureRequest {
            quality: VideoQuality::Hd720,
            frame_rate: 24,
            facing: CameraFacing::User,
        };
        let err = capture.acquire(&request).unwrap_err();
        assert!(matches!(
            err,
            CamlinkError::CaptureUnavailable(CaptureFailure::NotFound)
        ));
        assert!(!capture.is_acquired());
    }

    #[test]
    fn test_encoder_counts_sessions() {
        let encoder = SyntheticEncoder::new();
        encoder.start_encoding(VideoQuality::Hd1080, 30).unwrap();
        assert!(encoder.is_active());
        encoder.stop_encoding();
        assert!(!encoder.is_active());
        assert_eq!(encoder.sessions(), 1);
    }

    #[test]
    fn test_memory_notifications() {
        let sink = MemoryNotifications::new();
        sink.notify("Recording started", Severity::Success);
        assert!(sink.contains("Recording started"));
        assert_eq!(sink.entries().len(), 1);
    }
}
