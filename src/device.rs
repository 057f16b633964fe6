//! Camera device endpoint
//!
//! Owns the authoritative state store, the recording session, and the
//! camera side of the link. Displays a pairing code, waits for a remote,
//! executes inbound commands, and broadcasts status and sparse telemetry.
//!
//! All periodic work runs on tokio tasks guarded by the connection
//! manager's session flag: once the link drops, a late tick observes the
//! cleared flag and does nothing.

use crate::capture::{CaptureProvider, CaptureRequest, NotificationSink, RecordingEncoder};
use crate::config::CamlinkConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::errors::CamlinkError;
use crate::pairing::{PairingCode, PairingCodeGenerator};
use crate::protocol::{Command, Message, StatusSnapshot, TelemetryUpdate};
use crate::recording::{RecordingSession, RecordingSummary};
use crate::state::DeviceStateStore;
use crate::telemetry::TelemetrySource;
use crate::transport::{Channel, Rendezvous};
use crate::types::{CameraFacing, DeviceState, Severity, StatusEvent, StopReason, VideoQuality};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct DeviceInner {
    config: CamlinkConfig,
    rendezvous: Rendezvous,
    capture: Arc<dyn CaptureProvider>,
    encoder: Arc<dyn RecordingEncoder>,
    notifications: Arc<dyn NotificationSink>,
    telemetry: Mutex<Box<dyn TelemetrySource>>,
    pairing: Mutex<PairingCodeGenerator>,
    store: Mutex<DeviceStateStore>,
    session: Mutex<RecordingSession>,
    manager: Mutex<ConnectionManager>,
    channel: Mutex<Option<Arc<Channel>>>,
    last_telemetry: Mutex<TelemetryUpdate>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// The camera side of the link.
#[derive(Clone)]
pub struct CameraDevice {
    inner: Arc<DeviceInner>,
}

impl CameraDevice {
    pub fn new(
        config: CamlinkConfig,
        capture: Arc<dyn CaptureProvider>,
        encoder: Arc<dyn RecordingEncoder>,
        notifications: Arc<dyn NotificationSink>,
        telemetry: Box<dyn TelemetrySource>,
    ) -> Self {
        Self::with_rendezvous(
            config,
            capture,
            encoder,
            notifications,
            telemetry,
            Rendezvous::shared(),
        )
    }

    /// Construct against a specific rendezvous registry. Tests use this
    /// for isolation from the process-wide one.
    pub fn with_rendezvous(
        config: CamlinkConfig,
        capture: Arc<dyn CaptureProvider>,
        encoder: Arc<dyn RecordingEncoder>,
        notifications: Arc<dyn NotificationSink>,
        telemetry: Box<dyn TelemetrySource>,
        rendezvous: Rendezvous,
    ) -> Self {
        let heartbeat = config.heartbeat_interval();
        Self {
            inner: Arc::new(DeviceInner {
                config,
                rendezvous,
                capture,
                encoder,
                notifications,
                telemetry: Mutex::new(telemetry),
                pairing: Mutex::new(PairingCodeGenerator::new()),
                store: Mutex::new(DeviceStateStore::new()),
                session: Mutex::new(RecordingSession::new()),
                manager: Mutex::new(ConnectionManager::new(heartbeat)),
                channel: Mutex::new(None),
                last_telemetry: Mutex::new(TelemetryUpdate::default()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The code a remote must enter; generated on first call.
    pub fn pairing_code(&self) -> PairingCode {
        lock(&self.inner.pairing).generate()
    }

    /// Payload for the QR code shown next to the digits.
    pub fn scan_payload(&self) -> String {
        self.pairing_code().scan_payload()
    }

    /// Replace the displayed code. The old one is retired so a late
    /// connect with it fails as stale instead of hanging.
    pub fn refresh_pairing_code(&self) -> PairingCode {
        let (fresh, retired) = lock(&self.inner.pairing).refresh();
        if let Some(old) = retired {
            self.inner.rendezvous.retire(&old);
        }
        self.inner
            .notifications
            .notify("New pairing code generated", Severity::Info);
        fresh
    }

    /// Acquire the camera, host the pairing code, and wait for a remote.
    ///
    /// Resolves once the channel is up and the device is broadcasting.
    /// Hosting again while a remote is connected drops that remote first.
    pub async fn wait_for_remote(&self) -> Result<(), CamlinkError> {
        self.handle_channel_closed(None, false, "superseded by a new pairing wait");
        let request = {
            let store = lock(&self.inner.store);
            let state = store.snapshot();
            CaptureRequest {
                quality: state.quality,
                frame_rate: state.frame_rate,
                facing: state.camera_facing,
            }
        };
        if let Err(e) = self.inner.capture.acquire(&request) {
            self.inner.notifications.notify(&e.to_string(), Severity::Error);
            return Err(e);
        }

        let code = self.pairing_code();
        let pending = self.inner.rendezvous.register(&code);
        lock(&self.inner.manager).begin_waiting();
        log::info!("Hosting pairing code {}", code);

        let channel = match pending.accept().await {
            Ok(channel) => channel,
            Err(e) => {
                self.inner.capture.release();
                return Err(e);
            }
        };
        self.attach(channel);
        Ok(())
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock(&self.inner.manager).state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn device_state(&self) -> DeviceState {
        lock(&self.inner.store).snapshot()
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.inner.session).is_recording()
    }

    pub fn recording_elapsed_secs(&self) -> u64 {
        lock(&self.inner.session).elapsed_secs()
    }

    /// Start recording and broadcast `recording_started`.
    pub fn start_recording(&self) -> Result<(), CamlinkError> {
        if self.is_recording() {
            return Err(CamlinkError::RecordingAlreadyActive);
        }
        {
            let state = self.device_state();
            self.inner
                .encoder
                .start_encoding(state.quality, state.frame_rate)?;
        }
        if let Err(e) = lock(&self.inner.session).start() {
            self.inner.encoder.stop_encoding();
            return Err(e);
        }
        self.broadcast_status(StatusEvent::RecordingStarted);
        self.inner
            .notifications
            .notify("Recording started", Severity::Success);
        Ok(())
    }

    /// Stop recording and broadcast `recording_stopped`.
    pub fn stop_recording(&self) -> Result<RecordingSummary, CamlinkError> {
        let summary = lock(&self.inner.session).stop(StopReason::Requested)?;
        self.inner.encoder.stop_encoding();
        self.broadcast_status(StatusEvent::RecordingStopped);
        self.inner
            .notifications
            .notify("Recording stopped", Severity::Success);
        Ok(summary)
    }

    /// Forced stop used by every non-requested path. Safe when idle; the
    /// stopped broadcast goes out whenever a recording actually ended.
    pub fn force_stop_recording(&self, reason: StopReason) -> Option<RecordingSummary> {
        let summary = lock(&self.inner.session).force_stop(reason)?;
        self.inner.encoder.stop_encoding();
        self.broadcast_status(StatusEvent::RecordingStopped);
        Some(summary)
    }

    /// The device app lost foreground visibility.
    pub fn enter_background(&self) {
        if self.force_stop_recording(StopReason::Backgrounded).is_some() {
            self.inner
                .notifications
                .notify("Recording stopped: app went to background", Severity::Warning);
        }
    }

    pub fn set_zoom(&self, zoom: f32) -> f32 {
        let applied = lock(&self.inner.store).set_zoom(zoom);
        self.broadcast_status(StatusEvent::ZoomChanged);
        applied
    }

    pub fn set_quality(&self, quality: VideoQuality) {
        lock(&self.inner.store).set_quality(quality);
        self.broadcast_status(StatusEvent::QualityChanged);
    }

    pub fn set_frame_rate(&self, frame_rate: u32) -> u32 {
        let applied = lock(&self.inner.store).set_frame_rate(frame_rate);
        self.broadcast_status(StatusEvent::FramerateChanged);
        applied
    }

    pub fn flip_camera(&self) -> CameraFacing {
        let facing = lock(&self.inner.store).flip_camera();
        self.broadcast_status(StatusEvent::CameraFlipped);
        facing
    }

    pub fn toggle_flash(&self) -> bool {
        let on = lock(&self.inner.store).toggle_flash();
        self.broadcast_status(StatusEvent::FlashToggled);
        on
    }

    pub fn toggle_grid(&self) -> bool {
        let visible = lock(&self.inner.store).toggle_grid();
        self.broadcast_status(StatusEvent::GridToggled);
        visible
    }

    /// Tear the link down locally. A no-op before any pairing activity.
    pub fn disconnect(&self) {
        self.handle_channel_closed(None, true, "local disconnect");
    }

    fn attach(&self, channel: Channel) {
        let channel = Arc::new(channel);
        let session = channel.id();
        *lock(&self.inner.channel) = Some(Arc::clone(&channel));
        *lock(&self.inner.last_telemetry) = TelemetryUpdate::default();
        lock(&self.inner.manager).mark_connected();
        self.inner
            .notifications
            .notify("Remote control connected", Severity::Success);

        let flag = lock(&self.inner.manager).session_flag();
        let mut tasks = Vec::new();

        // Inbound loop: every message is proof of life.
        {
            let device = self.clone();
            let channel = Arc::clone(&channel);
            tasks.push(tokio::spawn(async move {
                while let Some(text) = channel.recv().await {
                    lock(&device.inner.manager).record_peer_traffic();
                    match Message::decode(&text) {
                        Ok(Message::Command { command, .. }) => device.handle_command(command),
                        Ok(other) => {
                            log::debug!("Ignoring non-command message: {:?}", other)
                        }
                        Err(e) => log::warn!("Dropping malformed message: {}", e),
                    }
                }
                device.handle_channel_closed(Some(session), true, "channel closed by peer");
            }));
        }

        // Sparse telemetry broadcast.
        {
            let device = self.clone();
            let flag = Arc::clone(&flag);
            let interval = self.inner.config.telemetry_broadcast_interval();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !flag.load(Ordering::SeqCst) {
                        break;
                    }
                    device.broadcast_telemetry();
                }
            }));
        }

        // Battery sampling.
        {
            let device = self.clone();
            let flag = Arc::clone(&flag);
            let interval = self.inner.config.battery_interval();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !flag.load(Ordering::SeqCst) {
                        break;
                    }
                    device.sample_battery();
                }
            }));
        }

        // Temperature sampling.
        {
            let device = self.clone();
            let flag = Arc::clone(&flag);
            let interval = self.inner.config.temperature_interval();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !flag.load(Ordering::SeqCst) {
                        break;
                    }
                    device.sample_temperature();
                }
            }));
        }

        // Recording duration ticks while a session is active.
        {
            let device = self.clone();
            let flag = Arc::clone(&flag);
            let interval = self.inner.config.recording_tick_interval();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !flag.load(Ordering::SeqCst) {
                        break;
                    }
                    device.broadcast_recording_tick();
                }
            }));
        }

        // Peer liveness.
        {
            let device = self.clone();
            let flag = Arc::clone(&flag);
            let interval = self.inner.config.liveness_check_interval();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !flag.load(Ordering::SeqCst) {
                        break;
                    }
                    let expired = lock(&device.inner.manager).liveness_expired();
                    if expired {
                        device.handle_channel_closed(Some(session), true, "peer liveness timeout");
                        break;
                    }
                }
            }));
        }

        lock(&self.inner.tasks).extend(tasks);
    }

    fn handle_command(&self, command: Command) {
        log::debug!("Executing command {}", command.name());
        match command {
            Command::StartRecording => {
                if let Err(e) = self.start_recording() {
                    log::warn!("start_recording failed: {}", e);
                    self.inner
                        .notifications
                        .notify(&format!("Could not start recording: {}", e), Severity::Error);
                }
            }
            Command::StopRecording => {
                if let Err(e) = self.stop_recording() {
                    log::warn!("stop_recording failed: {}", e);
                }
            }
            Command::SetQuality { quality } => self.set_quality(quality),
            Command::SetFramerate { frame_rate } => {
                self.set_frame_rate(frame_rate);
            }
            Command::SetZoom { zoom } => {
                self.set_zoom(zoom);
            }
            Command::FlipCamera => {
                self.flip_camera();
            }
            Command::ToggleFlash => {
                self.toggle_flash();
            }
            Command::ToggleGrid => {
                self.toggle_grid();
            }
            Command::Heartbeat => self.send_message(Message::response("heartbeat")),
        }
    }

    fn status_snapshot(&self) -> StatusSnapshot {
        let state = lock(&self.inner.store).snapshot();
        let session = lock(&self.inner.session);
        StatusSnapshot {
            is_recording: session.is_recording(),
            battery_level: state.battery_level,
            temperature: state.temperature,
            recording_duration: session.elapsed_secs(),
            zoom: state.zoom,
            quality: state.quality,
        }
    }

    fn broadcast_status(&self, event: StatusEvent) {
        let snapshot = self.status_snapshot();
        self.send_message(Message::status(event, snapshot));
    }

    /// Send only the telemetry fields that changed since the last send.
    fn broadcast_telemetry(&self) {
        let full = {
            let state = lock(&self.inner.store).snapshot();
            let session = lock(&self.inner.session);
            TelemetryUpdate {
                battery_level: Some(state.battery_level),
                temperature: Some(state.temperature),
                storage: Some(state.storage_available),
                signal: Some(state.signal_strength),
                is_recording: Some(session.is_recording()),
                recording_duration: Some(session.elapsed_secs()),
            }
        };
        let sparse = {
            let mut last = lock(&self.inner.last_telemetry);
            let sparse = TelemetryUpdate {
                battery_level: changed(&full.battery_level, &last.battery_level),
                temperature: changed(&full.temperature, &last.temperature),
                storage: changed(&full.storage, &last.storage),
                signal: changed(&full.signal, &last.signal),
                is_recording: changed(&full.is_recording, &last.is_recording),
                recording_duration: changed(&full.recording_duration, &last.recording_duration),
            };
            *last = full;
            sparse
        };
        if sparse.is_empty() {
            return;
        }
        self.send_message(Message::telemetry(sparse));
    }

    fn broadcast_recording_tick(&self) {
        let elapsed = {
            let session = lock(&self.inner.session);
            if !session.is_recording() {
                return;
            }
            session.elapsed_secs()
        };
        self.send_message(Message::telemetry(TelemetryUpdate {
            is_recording: Some(true),
            recording_duration: Some(elapsed),
            ..Default::default()
        }));
    }

    fn sample_battery(&self) {
        let recording = self.is_recording();
        let current = lock(&self.inner.store).snapshot().battery_level;
        let next = lock(&self.inner.telemetry).next_battery(current, recording);
        lock(&self.inner.store).set_battery_level(next);
    }

    fn sample_temperature(&self) {
        let recording = self.is_recording();
        let current = lock(&self.inner.store).snapshot().temperature;
        let next = lock(&self.inner.telemetry).next_temperature(current, recording);
        lock(&self.inner.store).set_temperature(next);
    }

    fn send_message(&self, message: Message) {
        let channel = lock(&self.inner.channel).clone();
        let Some(channel) = channel else {
            return;
        };
        match message.encode() {
            Ok(text) => {
                if channel.send(&text).is_err() {
                    log::debug!("Broadcast dropped, channel no longer open");
                }
            }
            Err(e) => log::warn!("Failed to encode outbound message: {}", e),
        }
    }

    /// Tear down one session. When `session` is given, only the owner of
    /// the current channel proceeds: a callback left over from a
    /// superseded channel must not touch the live link. `announce` gates
    /// the user-facing notification, which also requires having actually
    /// been connected.
    fn handle_channel_closed(&self, session: Option<Uuid>, announce: bool, why: &str) {
        if let Some(id) = session {
            let current = lock(&self.inner.channel).as_ref().map(|c| c.id());
            if current != Some(id) {
                return;
            }
        }
        let was_connected = {
            let mut manager = lock(&self.inner.manager);
            if manager.state() == ConnectionState::Idle {
                return;
            }
            let was = manager.state() == ConnectionState::Connected;
            if !manager.disconnect() {
                return;
            }
            was
        };
        log::info!("Camera link down: {}", why);

        // A recording interrupted by the link going away still ends with a
        // stopped broadcast; the send is a no-op if the channel is gone.
        self.force_stop_recording(StopReason::Disconnected);

        if let Some(channel) = lock(&self.inner.channel).take() {
            channel.close();
        }
        self.inner.capture.release();
        if announce && was_connected {
            self.inner
                .notifications
                .notify("Connection to remote control lost", Severity::Warning);
        }

        let handles: Vec<JoinHandle<()>> = lock(&self.inner.tasks).drain(..).collect();
        for handle in handles {
            handle.abort();
        }
    }
}

fn changed<T: PartialEq + Clone>(new: &Option<T>, old: &Option<T>) -> Option<T> {
    if new != old {
        new.clone()
    } else {
        None
    }
}
