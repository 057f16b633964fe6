//! In-process rendezvous by pairing code
//!
//! The camera registers its displayed code and awaits a peer; the remote
//! dials the code and either mates immediately or waits until the camera
//! registers or the timeout expires. Refreshing the camera's code retires
//! the old one so late dials fail fast as stale instead of timing out.

use crate::errors::CamlinkError;
use crate::pairing::PairingCode;
use crate::transport::Channel;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

lazy_static! {
    static ref GLOBAL: Rendezvous = Rendezvous::new();
}

/// Camera-side handle returned by [`Rendezvous::register`].
pub struct PendingAccept {
    code: PairingCode,
    rx: oneshot::Receiver<Channel>,
}

impl PendingAccept {
    pub fn code(&self) -> &PairingCode {
        &self.code
    }

    /// Wait for a remote to dial the registered code.
    ///
    /// Fails if the code is unregistered or retired before anyone dials.
    pub async fn accept(self) -> Result<Channel, CamlinkError> {
        self.rx.await.map_err(|_| {
            CamlinkError::ConnectionFailed("pairing code withdrawn before a peer connected".into())
        })
    }
}

#[derive(Default)]
struct Registry {
    /// Cameras waiting for a dial, by code.
    hosts: HashMap<String, oneshot::Sender<Channel>>,
    /// Remotes that dialed before the camera registered, by code.
    dialers: HashMap<String, Vec<oneshot::Sender<Channel>>>,
    /// Codes invalidated by a refresh.
    retired: HashSet<String>,
}

/// Registry mating camera and remote channels by pairing code.
///
/// `Rendezvous::shared()` is the process-wide instance; tests construct
/// their own for isolation.
#[derive(Clone)]
pub struct Rendezvous {
    inner: Arc<Mutex<Registry>>,
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

impl Rendezvous {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Process-wide registry.
    pub fn shared() -> Rendezvous {
        GLOBAL.clone()
    }

    /// Camera side: host a code and get a handle to await the peer.
    ///
    /// Registering a code makes it live again if it was retired, and
    /// replaces any previous host for the same code. A remote already
    /// waiting on the code is mated immediately.
    pub fn register(&self, code: &PairingCode) -> PendingAccept {
        let mut reg = self.lock();
        reg.retired.remove(code.as_str());

        let (tx, rx) = oneshot::channel();
        let pending = PendingAccept {
            code: code.clone(),
            rx,
        };

        // Mate with a dialer that got here first, if any.
        if let Some(mut waiters) = reg.dialers.remove(code.as_str()) {
            while let Some(waiter) = waiters.pop() {
                if waiter.is_closed() {
                    continue;
                }
                let (camera_half, remote_half) = Channel::pair();
                if waiter.send(remote_half).is_ok() {
                    let _ = tx.send(camera_half);
                    if !waiters.is_empty() {
                        reg.dialers.insert(code.as_str().to_string(), waiters);
                    }
                    log::info!("Pairing code {} matched a waiting remote", code);
                    return pending;
                }
            }
        }

        log::info!("Pairing code {} registered, awaiting remote", code);
        reg.hosts.insert(code.as_str().to_string(), tx);
        pending
    }

    /// Camera side: withdraw a hosted code without retiring it.
    pub fn unregister(&self, code: &PairingCode) {
        self.lock().hosts.remove(code.as_str());
    }

    /// Retire a code after a refresh. Pending dials fail as stale.
    pub fn retire(&self, code: &PairingCode) {
        let mut reg = self.lock();
        reg.hosts.remove(code.as_str());
        reg.dialers.remove(code.as_str());
        reg.retired.insert(code.as_str().to_string());
        log::debug!("Pairing code {} retired", code);
    }

    /// Remote side: dial a code, waiting up to `timeout` for the camera.
    pub async fn connect(
        &self,
        code: &PairingCode,
        timeout: Duration,
    ) -> Result<Channel, CamlinkError> {
        let rx = {
            let mut reg = self.lock();
            if reg.retired.contains(code.as_str()) {
                return Err(CamlinkError::StaleCode);
            }
            if let Some(host) = reg.hosts.remove(code.as_str()) {
                let (camera_half, remote_half) = Channel::pair();
                return match host.send(camera_half) {
                    Ok(()) => {
                        log::info!("Connected to camera via code {}", code);
                        Ok(remote_half)
                    }
                    Err(_) => Err(CamlinkError::ConnectionFailed(
                        "camera stopped waiting on this code".into(),
                    )),
                };
            }
            // Camera not here yet; park until it registers or we time out.
            let (tx, rx) = oneshot::channel();
            reg.dialers
                .entry(code.as_str().to_string())
                .or_default()
                .push(tx);
            rx
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(channel)) => {
                log::info!("Connected to camera via code {}", code);
                Ok(channel)
            }
            Ok(Err(_)) => {
                // Our waiter was dropped: the code was retired mid-dial.
                if self.lock().retired.contains(code.as_str()) {
                    Err(CamlinkError::StaleCode)
                } else {
                    Err(CamlinkError::ConnectionFailed(
                        "pairing attempt was cancelled".into(),
                    ))
                }
            }
            Err(_) => {
                let mut reg = self.lock();
                if let Some(waiters) = reg.dialers.get_mut(code.as_str()) {
                    waiters.retain(|w| !w.is_closed());
                    if waiters.is_empty() {
                        reg.dialers.remove(code.as_str());
                    }
                }
                Err(CamlinkError::ConnectionFailed(format!(
                    "no camera answered code {} within {:?}",
                    code, timeout
                )))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> PairingCode {
        PairingCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_register_then_connect() {
        let rdv = Rendezvous::new();
        let pending = rdv.register(&code("482913"));
        let remote = rdv
            .connect(&code("482913"), Duration::from_secs(1))
            .await
            .unwrap();
        let camera = pending.accept().await.unwrap();

        camera.send("hello").unwrap();
        assert_eq!(remote.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_connect_before_register() {
        let rdv = Rendezvous::new();
        let dial = {
            let rdv = rdv.clone();
            tokio::spawn(async move { rdv.connect(&code("111222"), Duration::from_secs(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let pending = rdv.register(&code("111222"));
        let camera = pending.accept().await.unwrap();
        let remote = dial.await.unwrap().unwrap();

        remote.send("hi").unwrap();
        assert_eq!(camera.recv().await.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_unknown_code_times_out() {
        let rdv = Rendezvous::new();
        let err = rdv
            .connect(&code("000000"), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, CamlinkError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_retired_code_is_stale() {
        let rdv = Rendezvous::new();
        let _pending = rdv.register(&code("482913"));
        rdv.retire(&code("482913"));
        let err = rdv
            .connect(&code("482913"), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, CamlinkError::StaleCode));
    }

    #[tokio::test]
    async fn test_retire_while_dialing_reports_stale() {
        let rdv = Rendezvous::new();
        let dial = {
            let rdv = rdv.clone();
            tokio::spawn(async move { rdv.connect(&code("333444"), Duration::from_secs(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        rdv.retire(&code("333444"));
        let err = dial.await.unwrap().unwrap_err();
        assert!(matches!(err, CamlinkError::StaleCode));
    }

    #[tokio::test]
    async fn test_reregister_clears_retirement() {
        let rdv = Rendezvous::new();
        rdv.retire(&code("555666"));
        let pending = rdv.register(&code("555666"));
        let remote = rdv
            .connect(&code("555666"), Duration::from_secs(1))
            .await
            .unwrap();
        let camera = pending.accept().await.unwrap();
        camera.send("back").unwrap();
        assert_eq!(remote.recv().await.as_deref(), Some("back"));
    }

    #[tokio::test]
    async fn test_accept_fails_when_unregistered() {
        let rdv = Rendezvous::new();
        let pending = rdv.register(&code("777888"));
        rdv.unregister(&code("777888"));
        assert!(pending.accept().await.is_err());
    }
}
