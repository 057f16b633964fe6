//! Configuration management for camlink
//!
//! Timing and limit settings for the connection, telemetry, and recording
//! layers, loadable from a TOML file with sensible defaults when the file
//! is absent.

use crate::errors::CamlinkError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CamlinkConfig {
    pub connection: ConnectionConfig,
    pub telemetry: TelemetryConfig,
    pub recording: RecordingConfig,
}

/// Pairing and connection lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// How long a remote waits for the camera to answer a code, seconds
    pub connect_timeout_secs: u64,
    /// Heartbeat cadence, seconds
    pub heartbeat_interval_secs: u64,
    /// How often each endpoint checks peer liveness, milliseconds
    pub liveness_check_interval_ms: u64,
}

/// Telemetry cadence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Sparse telemetry broadcast cadence, milliseconds
    pub broadcast_interval_ms: u64,
    /// Battery sampling cadence, milliseconds
    pub battery_interval_ms: u64,
    /// Temperature sampling cadence, milliseconds
    pub temperature_interval_ms: u64,
}

/// Recording session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Duration re-broadcast cadence while recording, milliseconds
    pub tick_interval_ms: u64,
}

impl Default for CamlinkConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig {
                connect_timeout_secs: 10,
                heartbeat_interval_secs: 5,
                liveness_check_interval_ms: 1000,
            },
            telemetry: TelemetryConfig {
                broadcast_interval_ms: 2000,
                battery_interval_ms: 5000,
                temperature_interval_ms: 3000,
            },
            recording: RecordingConfig {
                tick_interval_ms: 1000,
            },
        }
    }
}

impl CamlinkConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CamlinkError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CamlinkError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: CamlinkConfig = toml::from_str(&contents)
            .map_err(|e| CamlinkError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CamlinkError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CamlinkError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CamlinkError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CamlinkError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("camlink.toml")
    }

    /// Load from default location or create with defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.connection.connect_timeout_secs == 0 {
            return Err("Connect timeout must be at least 1 second".to_string());
        }
        if self.connection.heartbeat_interval_secs == 0 {
            return Err("Heartbeat interval must be at least 1 second".to_string());
        }
        if self.connection.liveness_check_interval_ms == 0 {
            return Err("Liveness check interval must be nonzero".to_string());
        }
        if self.telemetry.broadcast_interval_ms == 0
            || self.telemetry.battery_interval_ms == 0
            || self.telemetry.temperature_interval_ms == 0
        {
            return Err("Telemetry intervals must be nonzero".to_string());
        }
        if self.recording.tick_interval_ms == 0 {
            return Err("Recording tick interval must be nonzero".to_string());
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connect_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.connection.heartbeat_interval_secs)
    }

    pub fn liveness_check_interval(&self) -> Duration {
        Duration::from_millis(self.connection.liveness_check_interval_ms)
    }

    pub fn telemetry_broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.broadcast_interval_ms)
    }

    pub fn battery_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.battery_interval_ms)
    }

    pub fn temperature_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry.temperature_interval_ms)
    }

    pub fn recording_tick_interval(&self) -> Duration {
        Duration::from_millis(self.recording.tick_interval_ms)
    }
}
