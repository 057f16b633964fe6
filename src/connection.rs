//! Connection lifecycle management
//!
//! Tracks one endpoint's view of the link: idle, waiting or dialing,
//! connected, disconnected. While connected it accounts for heartbeats and
//! peer liveness: any inbound message counts as traffic, and silence for
//! twice the heartbeat interval expires the link. `Disconnected` ends the
//! session; a later dial or pairing wait starts a new one on the same
//! manager, over a brand-new channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Endpoint connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No pairing activity.
    Idle,
    /// Camera side: code displayed, waiting for a remote.
    AwaitingPeer,
    /// Remote side: dialing a code.
    Connecting,
    Connected,
    /// Terminal for this channel instance.
    Disconnected,
}

/// Per-session connection manager.
#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    heartbeat_interval: Duration,
    last_peer_traffic: Option<Instant>,
    last_heartbeat_sent: Option<Instant>,
    /// Cleared on disconnect; periodic tasks check it before acting.
    active: Arc<AtomicBool>,
}

impl ConnectionManager {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            state: ConnectionState::Idle,
            heartbeat_interval,
            last_peer_traffic: None,
            last_heartbeat_sent: None,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Silence longer than this expires the link.
    pub fn liveness_window(&self) -> Duration {
        self.heartbeat_interval * 2
    }

    /// Camera side: a code is displayed and we are waiting for a peer.
    pub fn begin_waiting(&mut self) {
        log::debug!("Connection state: {:?} -> AwaitingPeer", self.state);
        self.state = ConnectionState::AwaitingPeer;
    }

    /// Remote side: dialing a pairing code.
    pub fn begin_connecting(&mut self) {
        log::debug!("Connection state: {:?} -> Connecting", self.state);
        self.state = ConnectionState::Connecting;
    }

    /// Channel established; liveness accounting starts now.
    pub fn mark_connected(&mut self) {
        log::info!("Connection state: {:?} -> Connected", self.state);
        self.state = ConnectionState::Connected;
        self.last_peer_traffic = Some(Instant::now());
        self.last_heartbeat_sent = None;
        self.active.store(true, Ordering::SeqCst);
    }

    /// Any inbound message counts as proof of life.
    pub fn record_peer_traffic(&mut self) {
        self.last_peer_traffic = Some(Instant::now());
    }

    /// True when it is time to send the next heartbeat.
    pub fn heartbeat_due(&self) -> bool {
        self.heartbeat_due_at(Instant::now())
    }

    fn heartbeat_due_at(&self, now: Instant) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        match self.last_heartbeat_sent {
            Some(sent) => now.duration_since(sent) >= self.heartbeat_interval,
            None => true,
        }
    }

    pub fn mark_heartbeat_sent(&mut self) {
        self.last_heartbeat_sent = Some(Instant::now());
    }

    /// True when the peer has been silent past the liveness window.
    pub fn liveness_expired(&self) -> bool {
        self.liveness_expired_at(Instant::now())
    }

    pub(crate) fn liveness_expired_at(&self, now: Instant) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        match self.last_peer_traffic {
            Some(seen) => now.duration_since(seen) > self.liveness_window(),
            None => false,
        }
    }

    /// Move to `Disconnected`. Returns true the first time, so the caller
    /// emits exactly one "connection lost" notification.
    pub fn disconnect(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            return false;
        }
        log::info!("Connection state: {:?} -> Disconnected", self.state);
        self.state = ConnectionState::Disconnected;
        self.active.store(false, Ordering::SeqCst);
        true
    }

    /// Shared flag handed to periodic tasks; false once disconnected.
    pub fn session_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_manager() -> ConnectionManager {
        let mut mgr = ConnectionManager::new(Duration::from_secs(5));
        mgr.begin_connecting();
        mgr.mark_connected();
        mgr
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut mgr = ConnectionManager::new(Duration::from_secs(5));
        assert_eq!(mgr.state(), ConnectionState::Idle);
        mgr.begin_waiting();
        assert_eq!(mgr.state(), ConnectionState::AwaitingPeer);
        mgr.mark_connected();
        assert_eq!(mgr.state(), ConnectionState::Connected);
        assert!(mgr.is_active());
        assert!(mgr.disconnect());
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
        assert!(!mgr.is_active());
    }

    #[test]
    fn test_disconnect_notifies_once() {
        let mut mgr = connected_manager();
        assert!(mgr.disconnect());
        assert!(!mgr.disconnect());
    }

    #[test]
    fn test_heartbeat_due_immediately_after_connect() {
        let mut mgr = connected_manager();
        assert!(mgr.heartbeat_due());
        mgr.mark_heartbeat_sent();
        assert!(!mgr.heartbeat_due());
    }

    #[test]
    fn test_liveness_window_is_twice_interval() {
        let mgr = ConnectionManager::new(Duration::from_secs(5));
        assert_eq!(mgr.liveness_window(), Duration::from_secs(10));
    }

    #[test]
    fn test_liveness_expires_after_silence() {
        let mgr = connected_manager();
        let later = Instant::now() + Duration::from_secs(11);
        assert!(mgr.liveness_expired_at(later));
        let soon = Instant::now() + Duration::from_secs(3);
        assert!(!mgr.liveness_expired_at(soon));
    }

    #[test]
    fn test_traffic_resets_liveness() {
        let mut mgr = connected_manager();
        mgr.record_peer_traffic();
        assert!(!mgr.liveness_expired());
    }

    #[test]
    fn test_no_liveness_checks_when_not_connected() {
        let mut mgr = ConnectionManager::new(Duration::from_secs(5));
        mgr.begin_connecting();
        let later = Instant::now() + Duration::from_secs(60);
        assert!(!mgr.liveness_expired_at(later));
        assert!(!mgr.heartbeat_due());
    }

    #[test]
    fn test_session_flag_clears_on_disconnect() {
        let mut mgr = connected_manager();
        let flag = mgr.session_flag();
        assert!(flag.load(std::sync::atomic::Ordering::SeqCst));
        mgr.disconnect();
        assert!(!flag.load(std::sync::atomic::Ordering::SeqCst));
    }
}
