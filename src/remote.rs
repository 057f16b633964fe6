//! Remote control endpoint
//!
//! Dials a pairing code, issues fire-and-forget commands, and keeps a
//! mirror of the camera's state that only inbound status and telemetry
//! messages may touch. A user action on the remote never mutates the
//! mirror directly; the camera's next broadcast is what updates the UI.

use crate::capture::{CodeScanner, NotificationSink};
use crate::config::CamlinkConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::errors::CamlinkError;
use crate::pairing::PairingCode;
use crate::protocol::{Command, Message, StatusSnapshot, TelemetryUpdate};
use crate::state::MirrorState;
use crate::transport::{Channel, Rendezvous};
use crate::types::{Severity, StatusEvent, VideoQuality};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Things the remote surfaces to its UI layer.
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    Status {
        event: StatusEvent,
        state: StatusSnapshot,
    },
    Telemetry(TelemetryUpdate),
    Response {
        command: String,
    },
    ConnectionLost,
}

struct RemoteInner {
    config: CamlinkConfig,
    rendezvous: Rendezvous,
    notifications: Arc<dyn NotificationSink>,
    mirror: Mutex<MirrorState>,
    manager: Mutex<ConnectionManager>,
    channel: Mutex<Option<Arc<Channel>>>,
    events: broadcast::Sender<RemoteEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// The remote control side of the link.
#[derive(Clone)]
pub struct RemoteController {
    inner: Arc<RemoteInner>,
}

impl RemoteController {
    pub fn new(config: CamlinkConfig, notifications: Arc<dyn NotificationSink>) -> Self {
        Self::with_rendezvous(config, notifications, Rendezvous::shared())
    }

    /// Construct against a specific rendezvous registry. Tests use this
    /// for isolation from the process-wide one.
    pub fn with_rendezvous(
        config: CamlinkConfig,
        notifications: Arc<dyn NotificationSink>,
        rendezvous: Rendezvous,
    ) -> Self {
        let heartbeat = config.heartbeat_interval();
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(RemoteInner {
                config,
                rendezvous,
                notifications,
                mirror: Mutex::new(MirrorState::default()),
                manager: Mutex::new(ConnectionManager::new(heartbeat)),
                channel: Mutex::new(None),
                events,
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Dial a pairing code, waiting up to the configured connect timeout.
    ///
    /// Dialing while already connected drops the existing link first, so
    /// a leftover session can never tear down the one replacing it.
    pub async fn connect(&self, code: &PairingCode) -> Result<(), CamlinkError> {
        self.teardown(None, false, "superseded by a new dial");
        lock(&self.inner.manager).begin_connecting();
        let timeout = self.inner.config.connect_timeout();
        match self.inner.rendezvous.connect(code, timeout).await {
            Ok(channel) => {
                self.attach(channel);
                Ok(())
            }
            Err(e) => {
                lock(&self.inner.manager).disconnect();
                log::warn!("Connect with code {} failed: {}", code, e);
                Err(e)
            }
        }
    }

    /// Dial whatever code the scanner reads.
    pub async fn connect_by_scan(&self, scanner: &dyn CodeScanner) -> Result<(), CamlinkError> {
        let payload = scanner.scan()?;
        let code = PairingCode::from_scan_payload(&payload)?;
        self.connect(&code).await
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock(&self.inner.manager).state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Snapshot of the camera as last reported by the camera itself.
    pub fn mirror(&self) -> MirrorState {
        lock(&self.inner.mirror).clone()
    }

    /// Subscribe to status, telemetry, and lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<RemoteEvent> {
        self.inner.events.subscribe()
    }

    /// Send a command. Fails with [`CamlinkError::ChannelNotOpen`] when the
    /// link is down; the mirror is untouched either way.
    pub fn send_command(&self, command: Command) -> Result<(), CamlinkError> {
        let channel = lock(&self.inner.channel)
            .clone()
            .ok_or(CamlinkError::ChannelNotOpen)?;
        let text = Message::command(command).encode()?;
        channel.send(&text)
    }

    pub fn start_recording(&self) -> Result<(), CamlinkError> {
        self.send_command(Command::StartRecording)
    }

    pub fn stop_recording(&self) -> Result<(), CamlinkError> {
        self.send_command(Command::StopRecording)
    }

    pub fn set_zoom(&self, zoom: f32) -> Result<(), CamlinkError> {
        self.send_command(Command::SetZoom { zoom })
    }

    pub fn set_quality(&self, quality: VideoQuality) -> Result<(), CamlinkError> {
        self.send_command(Command::SetQuality { quality })
    }

    pub fn set_frame_rate(&self, frame_rate: u32) -> Result<(), CamlinkError> {
        self.send_command(Command::SetFramerate { frame_rate })
    }

    pub fn flip_camera(&self) -> Result<(), CamlinkError> {
        self.send_command(Command::FlipCamera)
    }

    pub fn toggle_flash(&self) -> Result<(), CamlinkError> {
        self.send_command(Command::ToggleFlash)
    }

    pub fn toggle_grid(&self) -> Result<(), CamlinkError> {
        self.send_command(Command::ToggleGrid)
    }

    /// Tear the link down locally. A no-op before the first dial.
    pub fn disconnect(&self) {
        self.teardown(None, true, "local disconnect");
    }

    fn attach(&self, channel: Channel) {
        let channel = Arc::new(channel);
        let session = channel.id();
        *lock(&self.inner.channel) = Some(Arc::clone(&channel));
        *lock(&self.inner.mirror) = MirrorState::default();
        lock(&self.inner.manager).mark_connected();
        self.inner
            .notifications
            .notify("Connected to camera device", Severity::Success);

        let flag = lock(&self.inner.manager).session_flag();
        let mut tasks = Vec::new();

        // Inbound loop: apply broadcasts to the mirror.
        {
            let remote = self.clone();
            let channel = Arc::clone(&channel);
            tasks.push(tokio::spawn(async move {
                while let Some(text) = channel.recv().await {
                    lock(&remote.inner.manager).record_peer_traffic();
                    remote.handle_message(&text);
                }
                remote.teardown(Some(session), true, "channel closed by peer");
            }));
        }

        // Heartbeats out, liveness in, one cadence for both checks.
        {
            let remote = self.clone();
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
                    let due = lock(&remote.inner.manager).heartbeat_due();
                    if due {
                        if remote.send_command(Command::Heartbeat).is_ok() {
                            lock(&remote.inner.manager).mark_heartbeat_sent();
                        }
                    }
                    let expired = lock(&remote.inner.manager).liveness_expired();
                    if expired {
                        remote.teardown(Some(session), true, "camera liveness timeout");
                        break;
                    }
                }
            }));
        }

        lock(&self.inner.tasks).extend(tasks);
    }

    fn handle_message(&self, text: &str) {
        match Message::decode(text) {
            Ok(Message::Status {
                event,
                state,
                timestamp,
            }) => {
                lock(&self.inner.mirror).apply_status(&state, timestamp);
                let _ = self.inner.events.send(RemoteEvent::Status { event, state });
            }
            Ok(Message::Telemetry { data, timestamp }) => {
                lock(&self.inner.mirror).apply_telemetry(&data, timestamp);
                let _ = self.inner.events.send(RemoteEvent::Telemetry(data));
            }
            Ok(Message::Response { command, .. }) => {
                log::debug!("Camera acknowledged {}", command);
                let _ = self.inner.events.send(RemoteEvent::Response { command });
            }
            Ok(Message::Command { command, .. }) => {
                log::warn!("Unexpected command {} from camera side", command.name());
            }
            Err(e) => log::warn!("Dropping malformed message: {}", e),
        }
    }

    /// Tear down one session. When `session` is given, only the owner of
    /// the current channel proceeds: a callback left over from a
    /// superseded channel must not touch the live link. `announce` gates
    /// the user-facing notification and the [`RemoteEvent::ConnectionLost`]
    /// event; both also require having actually been connected.
    fn teardown(&self, session: Option<Uuid>, announce: bool, why: &str) {
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
        log::info!("Remote link down: {}", why);

        if let Some(channel) = lock(&self.inner.channel).take() {
            channel.close();
        }
        if announce && was_connected {
            self.inner
                .notifications
                .notify("Connection to camera device lost", Severity::Warning);
            let _ = self.inner.events.send(RemoteEvent::ConnectionLost);
        }

        let handles: Vec<JoinHandle<()>> = lock(&self.inner.tasks).drain(..).collect();
        for handle in handles {
            handle.abort();
        }
    }
}
