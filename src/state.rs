//! Camera device state store and remote-side mirror
//!
//! The camera endpoint owns a [`DeviceStateStore`], the single writer for
//! all device settings. Every setter clamps to hardware limits and reports
//! the applied value. The remote endpoint owns a [`MirrorState`] that is
//! only ever updated from inbound status and telemetry messages; user
//! actions on the remote go out as commands, never as local writes.

use crate::protocol::{StatusSnapshot, TelemetryUpdate};
use crate::types::{CameraFacing, DeviceState, VideoQuality};
use crate::assert_invariant;

/// Optical zoom limits.
pub const ZOOM_MIN: f32 = 1.0;
pub const ZOOM_MAX: f32 = 5.0;

/// Battery percentage limits.
pub const BATTERY_MIN: f32 = 0.0;
pub const BATTERY_MAX: f32 = 100.0;

/// Simulated enclosure temperature limits (Fahrenheit).
pub const TEMP_MIN: f32 = 65.0;
pub const TEMP_MAX: f32 = 95.0;

/// Authoritative device state, camera side only.
#[derive(Debug, Default)]
pub struct DeviceStateStore {
    state: DeviceState,
}

impl DeviceStateStore {
    pub fn new() -> Self {
        Self {
            state: DeviceState::default(),
        }
    }

    pub fn snapshot(&self) -> DeviceState {
        self.state.clone()
    }

    /// Clamp and apply a zoom level; returns the value actually applied.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        let applied = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        self.state.zoom = applied;
        assert_invariant!(
            (ZOOM_MIN..=ZOOM_MAX).contains(&self.state.zoom),
            "Zoom stays within optical limits",
            "state::set_zoom"
        );
        applied
    }

    pub fn zoom(&self) -> f32 {
        self.state.zoom
    }

    pub fn set_quality(&mut self, quality: VideoQuality) {
        self.state.quality = quality;
    }

    /// Apply a frame rate; zero is rejected by keeping the current value.
    pub fn set_frame_rate(&mut self, frame_rate: u32) -> u32 {
        if frame_rate > 0 {
            self.state.frame_rate = frame_rate;
        } else {
            log::warn!("Ignoring frame rate of 0");
        }
        self.state.frame_rate
    }

    pub fn flip_camera(&mut self) -> CameraFacing {
        self.state.camera_facing = self.state.camera_facing.flipped();
        self.state.camera_facing
    }

    pub fn toggle_flash(&mut self) -> bool {
        self.state.flash_on = !self.state.flash_on;
        self.state.flash_on
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.state.grid_visible = !self.state.grid_visible;
        self.state.grid_visible
    }

    /// Clamp and apply a battery level; returns the value actually applied.
    pub fn set_battery_level(&mut self, level: f32) -> f32 {
        let applied = level.clamp(BATTERY_MIN, BATTERY_MAX);
        self.state.battery_level = applied;
        assert_invariant!(
            (BATTERY_MIN..=BATTERY_MAX).contains(&self.state.battery_level),
            "Battery level stays within 0-100",
            "state::set_battery_level"
        );
        applied
    }

    /// Clamp and apply a temperature reading; returns the applied value.
    pub fn set_temperature(&mut self, temperature: f32) -> f32 {
        let applied = temperature.clamp(TEMP_MIN, TEMP_MAX);
        self.state.temperature = applied;
        assert_invariant!(
            (TEMP_MIN..=TEMP_MAX).contains(&self.state.temperature),
            "Temperature stays within simulated bounds",
            "state::set_temperature"
        );
        applied
    }
}

/// Remote-side view of the camera. Updated only from inbound messages.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorState {
    pub battery_level: f32,
    pub temperature: f32,
    pub storage: String,
    pub signal: u8,
    pub is_recording: bool,
    pub recording_duration: u64,
    pub zoom: f32,
    pub quality: VideoQuality,
    /// Timestamp of the last message that touched the mirror, epoch ms.
    pub last_update_ms: i64,
}

impl Default for MirrorState {
    fn default() -> Self {
        let base = DeviceState::default();
        Self {
            battery_level: base.battery_level,
            temperature: base.temperature,
            storage: base.storage_available,
            signal: base.signal_strength,
            is_recording: false,
            recording_duration: 0,
            zoom: base.zoom,
            quality: base.quality,
            last_update_ms: 0,
        }
    }
}

impl MirrorState {
    /// Apply a sparse telemetry update. Absent fields are left untouched.
    pub fn apply_telemetry(&mut self, update: &TelemetryUpdate, timestamp: i64) {
        if let Some(level) = update.battery_level {
            self.battery_level = level;
        }
        if let Some(temp) = update.temperature {
            self.temperature = temp;
        }
        if let Some(storage) = &update.storage {
            self.storage = storage.clone();
        }
        if let Some(signal) = update.signal {
            self.signal = signal;
        }
        if let Some(recording) = update.is_recording {
            self.is_recording = recording;
        }
        if let Some(duration) = update.recording_duration {
            self.recording_duration = duration;
        }
        self.last_update_ms = timestamp;
    }

    /// Apply the full snapshot carried by a status broadcast.
    pub fn apply_status(&mut self, state: &StatusSnapshot, timestamp: i64) {
        self.is_recording = state.is_recording;
        self.battery_level = state.battery_level;
        self.temperature = state.temperature;
        self.recording_duration = state.recording_duration;
        self.zoom = state.zoom;
        self.quality = state.quality;
        self.last_update_ms = timestamp;
    }
}
