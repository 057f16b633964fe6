//! Recording session lifecycle
//!
//! Two states: idle and recording. The elapsed duration is always derived
//! from the captured start instant, never accumulated by ticks, so a
//! delayed or missed tick can not skew it.

use crate::errors::CamlinkError;
use crate::types::StopReason;
use std::time::Instant;

/// Recording lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

/// Summary of a finished recording, produced by every stop path.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    /// Epoch ms when recording started.
    pub started_at_ms: i64,
    /// Whole seconds recorded.
    pub duration_secs: u64,
    pub reason: StopReason,
}

/// Idle/Recording state machine owned by the camera endpoint.
#[derive(Debug, Default)]
pub struct RecordingSession {
    active: Option<ActiveRecording>,
}

#[derive(Debug)]
struct ActiveRecording {
    started_at: Instant,
    started_at_ms: i64,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn state(&self) -> RecordingState {
        if self.active.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start recording. Fails if one is already active.
    pub fn start(&mut self) -> Result<(), CamlinkError> {
        if self.active.is_some() {
            return Err(CamlinkError::RecordingAlreadyActive);
        }
        self.active = Some(ActiveRecording {
            started_at: Instant::now(),
            started_at_ms: crate::protocol::now_ms(),
        });
        log::info!("Recording started");
        Ok(())
    }

    /// Stop recording. Fails if nothing is active.
    ///
    /// Forced stops (backgrounded, disconnected, camera error) use the same
    /// path as a requested stop; only the reported reason differs.
    pub fn stop(&mut self, reason: StopReason) -> Result<RecordingSummary, CamlinkError> {
        let active = self.active.take().ok_or(CamlinkError::RecordingNotActive)?;
        let summary = RecordingSummary {
            started_at_ms: active.started_at_ms,
            duration_secs: active.started_at.elapsed().as_secs(),
            reason,
        };
        log::info!(
            "Recording stopped after {}s ({:?})",
            summary.duration_secs,
            reason
        );
        Ok(summary)
    }

    /// Stop if recording, no-op otherwise. Used by forced-stop paths that
    /// must be safe to call unconditionally.
    pub fn force_stop(&mut self, reason: StopReason) -> Option<RecordingSummary> {
        self.stop(reason).ok()
    }

    /// Whole seconds since recording started; 0 when idle.
    ///
    /// Recomputed from the start instant on every call.
    pub fn elapsed_secs(&self) -> u64 {
        self.active
            .as_ref()
            .map(|a| a.started_at.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Epoch ms at which the active recording started, if any.
    pub fn started_at_ms(&self) -> Option<i64> {
        self.active.as_ref().map(|a| a.started_at_ms)
    }
}
