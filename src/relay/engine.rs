//! Relay Engine
//!
//! Owns the single `Session` and the outbound channel of every live
//! connection. Each event runs the session transition under one lock and its
//! effects are queued before the lock is released, so sends reach each
//! connection in the order the session produced them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::metrics::Metrics;
use crate::protocol::{Payload, CLOSE_INTERNAL_ERROR, REASON_SEND_QUEUE_FULL};
use crate::relay::session::{ConnectionId, Effect, Event, Outcome, Session};

/// Close instruction handed to a connection's writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseRequest {
    pub code: u16,
    pub reason: &'static str,
}

/// Receiving side of a connection's outbound traffic
#[derive(Debug)]
pub struct Outbox {
    pub frames: mpsc::Receiver<Payload>,
    pub close: watch::Receiver<Option<CloseRequest>>,
}

#[derive(Debug)]
struct PeerHandle {
    frames: mpsc::Sender<Payload>,
    close: watch::Sender<Option<CloseRequest>>,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub broadcaster: Option<ConnectionId>,
    pub viewer: Option<ConnectionId>,
    pub connections: usize,
}

impl SessionSnapshot {
    pub fn broadcaster_connected(&self) -> bool {
        self.broadcaster.is_some()
    }

    pub fn viewer_connected(&self) -> bool {
        self.viewer.is_some()
    }
}

struct Inner {
    session: Session,
    peers: HashMap<ConnectionId, PeerHandle>,
    shut_down: bool,
}

/// Drives the session from transport events
pub struct RelayEngine {
    inner: Mutex<Inner>,
    next_connection_id: AtomicU64,
    queue_capacity: usize,
    metrics: Arc<Metrics>,
}

impl RelayEngine {
    pub fn new(config: &RelayConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                session: Session::new(config.malformed_policy),
                peers: HashMap::new(),
                shut_down: false,
            }),
            next_connection_id: AtomicU64::new(1),
            queue_capacity: config.send_queue_capacity,
            metrics,
        }
    }

    /// Register a new connection and deliver its connect event
    pub fn connect(&self) -> (ConnectionId, Outbox) {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let (frames_tx, frames_rx) = mpsc::channel(self.queue_capacity);
        let (close_tx, close_rx) = watch::channel(None);

        let mut inner = self.lock();
        inner.peers.insert(
            id,
            PeerHandle {
                frames: frames_tx,
                close: close_tx,
            },
        );
        let mut transition = inner.session.handle(id, Event::Connect);
        if inner.shut_down {
            // upgraded while shutdown was running
            debug!(connection_id = id, "Connected after shutdown, closing");
            transition.effects.extend(inner.session.shutdown());
        }
        self.metrics.record_outcome(&transition.outcome);
        Self::dispatch(&inner.peers, transition.effects, &self.metrics);

        (
            id,
            Outbox {
                frames: frames_rx,
                close: close_rx,
            },
        )
    }

    /// Deliver a message, disconnect or error event for `id`
    pub fn handle(&self, id: ConnectionId, event: Event) -> Outcome {
        let terminal = matches!(event, Event::Disconnect | Event::Error(_));

        let mut inner = self.lock();
        let transition = inner.session.handle(id, event);
        if terminal {
            inner.peers.remove(&id);
        }
        self.metrics.record_outcome(&transition.outcome);
        Self::dispatch(&inner.peers, transition.effects, &self.metrics);

        transition.outcome
    }

    /// Close every live connection with "going away"
    pub fn shutdown(&self) -> usize {
        let mut inner = self.lock();
        inner.shut_down = true;
        let effects = inner.session.shutdown();
        let closed = effects.len();
        Self::dispatch(&inner.peers, effects, &self.metrics);
        info!("Closing {} connections for shutdown", closed);
        closed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            broadcaster: inner.session.broadcaster(),
            viewer: inner.session.viewer(),
            connections: inner.session.connection_count(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // transitions never leave the session half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(peers: &HashMap<ConnectionId, PeerHandle>, effects: Vec<Effect>, metrics: &Metrics) {
        for effect in effects {
            match effect {
                Effect::Send { to, payload } => {
                    let Some(peer) = peers.get(&to) else {
                        debug!(connection_id = to, "Send target already gone");
                        metrics.send_failed();
                        continue;
                    };
                    match peer.frames.try_send(payload) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            warn!(connection_id = to, "Outbound queue full, closing connection");
                            metrics.send_failed();
                            let request = CloseRequest {
                                code: CLOSE_INTERNAL_ERROR,
                                reason: REASON_SEND_QUEUE_FULL,
                            };
                            peer.close.send_if_modified(|current| {
                                if current.is_some() {
                                    return false;
                                }
                                *current = Some(request);
                                true
                            });
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            debug!(connection_id = to, "Outbound queue closed, dropping frame");
                            metrics.send_failed();
                        }
                    }
                }
                Effect::Close { to, code, reason } => {
                    if let Some(peer) = peers.get(&to) {
                        debug!(connection_id = to, code, reason, "Requesting close");
                        peer.close.send_replace(Some(CloseRequest { code, reason }));
                    }
                }
            }
        }
    }
}
