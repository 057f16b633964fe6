//! Channel transport
//!
//! A [`Channel`] is one endpoint of an ordered, reliable, bidirectional
//! message pipe. Sends on a channel that is not open fail immediately and
//! nothing is queued for later. A closed channel never reopens; pairing
//! again produces a brand-new channel with no carried-over state.
//!
//! The in-process rendezvous that mates two channels by pairing code lives
//! in [`memory`]. A network transport would produce the same `Channel`
//! surface.

pub mod memory;

pub use memory::{PendingAccept, Rendezvous};

use crate::errors::CamlinkError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Default time a remote waits for the camera before giving up.
pub const DEFAULT_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// One endpoint of an ordered reliable duplex pipe.
pub struct Channel {
    id: Uuid,
    /// Shared with the peer half; either side closing clears it.
    open: Arc<AtomicBool>,
    tx: StdMutex<Option<mpsc::UnboundedSender<String>>>,
    rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Channel {
    /// Build a connected pair of channel endpoints.
    pub fn pair() -> (Channel, Channel) {
        let id = Uuid::new_v4();
        let open = Arc::new(AtomicBool::new(true));
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a = Channel {
            id,
            open: Arc::clone(&open),
            tx: StdMutex::new(Some(a_tx)),
            rx: Mutex::new(a_rx),
        };
        let b = Channel {
            id,
            open,
            tx: StdMutex::new(Some(b_tx)),
            rx: Mutex::new(b_rx),
        };
        (a, b)
    }

    /// Identifier shared by both halves of the pair.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Send one message. Fails with [`CamlinkError::ChannelNotOpen`] if the
    /// channel is closed; the message is never queued in that case.
    pub fn send(&self, text: &str) -> Result<(), CamlinkError> {
        if !self.is_open() {
            return Err(CamlinkError::ChannelNotOpen);
        }
        let guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_ref() {
            Some(tx) => tx.send(text.to_string()).map_err(|_| {
                self.open.store(false, Ordering::SeqCst);
                CamlinkError::ChannelNotOpen
            }),
            None => Err(CamlinkError::ChannelNotOpen),
        }
    }

    /// Receive the next message in send order. `None` means the peer
    /// closed; messages sent before the close are still delivered first.
    pub async fn recv(&self) -> Option<String> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(text) => Some(text),
            None => {
                self.open.store(false, Ordering::SeqCst);
                None
            }
        }
    }

    /// Close both halves. Further sends on either side fail; the peer's
    /// receive loop drains what was already sent, then ends.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let mut guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}
