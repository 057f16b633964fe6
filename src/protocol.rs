//! JSON wire protocol between camera and remote
//!
//! Four message kinds travel over the channel: `command` (remote to
//! camera), `status` and `telemetry` (camera to remote), and `response`
//! (camera acknowledging a command). Decoding is forward tolerant: unknown
//! fields are ignored, while an unknown `type` or `command` is rejected as
//! malformed so the caller can log and drop it without closing the channel.

use crate::errors::CamlinkError;
use crate::types::{StatusEvent, VideoQuality};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Epoch milliseconds, the timestamp unit used on the wire.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A command issued by the remote.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartRecording,
    StopRecording,
    SetQuality { quality: VideoQuality },
    SetFramerate { frame_rate: u32 },
    SetZoom { zoom: f32 },
    FlipCamera,
    ToggleFlash,
    ToggleGrid,
    Heartbeat,
}

impl Command {
    /// Wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartRecording => "start_recording",
            Command::StopRecording => "stop_recording",
            Command::SetQuality { .. } => "set_quality",
            Command::SetFramerate { .. } => "set_framerate",
            Command::SetZoom { .. } => "set_zoom",
            Command::FlipCamera => "flip_camera",
            Command::ToggleFlash => "toggle_flash",
            Command::ToggleGrid => "toggle_grid",
            Command::Heartbeat => "heartbeat",
        }
    }

    fn payload(&self) -> Value {
        match self {
            Command::SetQuality { quality } => json!({ "quality": quality }),
            Command::SetFramerate { frame_rate } => json!({ "frameRate": frame_rate }),
            Command::SetZoom { zoom } => json!({ "zoom": zoom }),
            _ => json!({}),
        }
    }

    fn from_wire(name: &str, data: &Value) -> Result<Self, CamlinkError> {
        match name {
            "start_recording" => Ok(Command::StartRecording),
            "stop_recording" => Ok(Command::StopRecording),
            "set_quality" => {
                let quality = field(data, "quality")?;
                Ok(Command::SetQuality { quality })
            }
            "set_framerate" => {
                let frame_rate = field(data, "frameRate")?;
                Ok(Command::SetFramerate { frame_rate })
            }
            "set_zoom" => {
                let zoom = field(data, "zoom")?;
                Ok(Command::SetZoom { zoom })
            }
            "flip_camera" => Ok(Command::FlipCamera),
            "toggle_flash" => Ok(Command::ToggleFlash),
            "toggle_grid" => Ok(Command::ToggleGrid),
            "heartbeat" => Ok(Command::Heartbeat),
            other => Err(CamlinkError::MalformedMessage(format!(
                "unknown command '{}'",
                other
            ))),
        }
    }
}

fn field<T: serde::de::DeserializeOwned>(data: &Value, key: &str) -> Result<T, CamlinkError> {
    let value = data
        .get(key)
        .ok_or_else(|| CamlinkError::MalformedMessage(format!("missing field '{}'", key)))?;
    serde_json::from_value(value.clone())
        .map_err(|e| CamlinkError::MalformedMessage(format!("field '{}': {}", key, e)))
}

/// Snapshot of camera state carried by every status broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_recording: bool,
    pub battery_level: f32,
    pub temperature: f32,
    /// Seconds since recording started; 0 when idle.
    pub recording_duration: u64,
    pub zoom: f32,
    pub quality: VideoQuality,
}

/// Sparse telemetry update. Absent fields mean "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recording: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_duration: Option<u64>,
}

impl TelemetryUpdate {
    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self == &TelemetryUpdate::default()
    }
}

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Command {
        command: Command,
        timestamp: i64,
    },
    Status {
        event: StatusEvent,
        state: StatusSnapshot,
        timestamp: i64,
    },
    Telemetry {
        data: TelemetryUpdate,
        timestamp: i64,
    },
    Response {
        command: String,
        timestamp: i64,
    },
}

impl Message {
    /// Build a command message stamped with the current time.
    pub fn command(command: Command) -> Self {
        Message::Command {
            command,
            timestamp: now_ms(),
        }
    }

    /// Build a status message stamped with the current time.
    pub fn status(event: StatusEvent, state: StatusSnapshot) -> Self {
        Message::Status {
            event,
            state,
            timestamp: now_ms(),
        }
    }

    /// Build a telemetry message stamped with the current time.
    pub fn telemetry(data: TelemetryUpdate) -> Self {
        Message::Telemetry {
            data,
            timestamp: now_ms(),
        }
    }

    /// Build a response message stamped with the current time.
    pub fn response(command: &str) -> Self {
        Message::Response {
            command: command.to_string(),
            timestamp: now_ms(),
        }
    }

    /// Encode to the JSON text sent over the channel.
    pub fn encode(&self) -> Result<String, CamlinkError> {
        let value = match self {
            Message::Command { command, timestamp } => json!({
                "type": "command",
                "command": command.name(),
                "data": command.payload(),
                "timestamp": timestamp,
            }),
            Message::Status {
                event,
                state,
                timestamp,
            } => json!({
                "type": "status",
                "event": event,
                "state": state,
                "data": {},
                "timestamp": timestamp,
            }),
            Message::Telemetry { data, timestamp } => json!({
                "type": "telemetry",
                "data": data,
                "timestamp": timestamp,
            }),
            Message::Response { command, timestamp } => json!({
                "type": "response",
                "command": command,
                "timestamp": timestamp,
            }),
        };
        serde_json::to_string(&value).map_err(CamlinkError::from)
    }

    /// Decode JSON text received from the channel.
    pub fn decode(text: &str) -> Result<Self, CamlinkError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CamlinkError::MalformedMessage("missing 'type'".to_string()))?;
        let timestamp = value.get("timestamp").and_then(Value::as_i64).unwrap_or(0);

        match kind {
            "command" => {
                let name = value.get("command").and_then(Value::as_str).ok_or_else(|| {
                    CamlinkError::MalformedMessage("missing 'command'".to_string())
                })?;
                let empty = json!({});
                let data = value.get("data").unwrap_or(&empty);
                let command = Command::from_wire(name, data)?;
                Ok(Message::Command { command, timestamp })
            }
            "status" => {
                let event = field(&value, "event")?;
                let state = field(&value, "state")?;
                Ok(Message::Status {
                    event,
                    state,
                    timestamp,
                })
            }
            "telemetry" => {
                let data = field(&value, "data")?;
                Ok(Message::Telemetry { data, timestamp })
            }
            "response" => {
                let command = value
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                Ok(Message::Response { command, timestamp })
            }
            other => Err(CamlinkError::MalformedMessage(format!(
                "unknown message type '{}'",
                other
            ))),
        }
    }
}
