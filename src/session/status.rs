use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

/// User-visible state of the conversation client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No session active.
    Idle,
    /// Session opening (device acquisition + handshake).
    Connecting,
    /// Session open, waiting for or receiving user speech.
    Listening,
    /// Model audio is playing.
    Speaking,
    /// A fatal error ended the session; cleared by the next stop.
    Error,
}

impl Status {
    /// Whether moving from `self` to `to` is a legal edge.
    ///
    /// Stop can reach Idle from anywhere and any state can fail into
    /// Error; everything else follows the session lifecycle.
    pub fn can_transition(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (_, Idle)
                | (_, Error)
                | (Idle, Connecting)
                | (Connecting, Listening)
                | (Listening, Speaking)
                | (Speaking, Listening)
        )
    }
}

/// The single process-wide status value, observable through a watch channel.
///
/// Illegal transitions are rejected and logged, never applied.
#[derive(Clone)]
pub struct StatusCell {
    tx: Arc<watch::Sender<Status>>,
}

impl StatusCell {
    pub fn new() -> (Self, watch::Receiver<Status>) {
        let (tx, rx) = watch::channel(Status::Idle);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn current(&self) -> Status {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }

    /// Apply `to` if the edge is legal. Self-transitions are no-ops.
    pub fn transition(&self, to: Status) -> bool {
        let from = self.current();
        if from == to {
            return true;
        }
        if !from.can_transition(to) {
            warn!(?from, ?to, "Ignoring illegal status transition");
            return false;
        }
        debug!(?from, ?to, "Status transition");
        self.tx.send_replace(to);
        true
    }
}
