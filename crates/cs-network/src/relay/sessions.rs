use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use cs_core::SessionId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Frames a session may have queued before it counts as stuck.
pub(crate) const SESSION_QUEUE_CAPACITY: usize = 128;

/// Live session count, read by the advertiser.
pub trait SessionCount: Send + Sync {
    fn connected_count(&self) -> usize;
}

/// Writer queue of one session plus the token that ends it.
#[derive(Clone)]
pub(crate) struct SessionHandle {
    writer: mpsc::Sender<Message>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub(crate) fn new(writer: mpsc::Sender<Message>, cancel: CancellationToken) -> Self {
        Self { writer, cancel }
    }
}

/// Registered relay sessions, each reachable through its writer queue.
#[derive(Default)]
pub(crate) struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    count: AtomicUsize,
}

impl SessionRegistry {
    pub(crate) async fn register(&self, id: SessionId, handle: SessionHandle) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, handle);
        self.count.store(sessions.len(), Ordering::SeqCst);
    }

    pub(crate) async fn deregister(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        self.count.store(sessions.len(), Ordering::SeqCst);
        removed
    }

    /// Queue `message` for every session except `from`.
    ///
    /// Iterates over a snapshot, so sessions may connect or leave meanwhile.
    /// A session whose queue is closed or full is removed and cancelled; the
    /// rest still get the message. Returns the number of sessions it was
    /// queued for.
    pub(crate) async fn broadcast(&self, from: &SessionId, message: Message) -> usize {
        let targets: Vec<(SessionId, SessionHandle)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(id, _)| *id != from)
                .map(|(id, handle)| (id.clone(), handle.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut evicted = Vec::new();
        for (id, handle) in targets {
            match handle.writer.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(session_id = %id, "session queue full, dropping stalled session");
                    evicted.push((id, handle.cancel));
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(session_id = %id, "dropping session with closed writer");
                    evicted.push((id, handle.cancel));
                }
            }
        }

        for (id, cancel) in evicted {
            self.deregister(&id).await;
            cancel.cancel();
        }
        delivered
    }

    pub(crate) async fn clear(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.clear();
        self.count.store(0, Ordering::SeqCst);
    }
}

impl SessionCount for SessionRegistry {
    fn connected_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}
