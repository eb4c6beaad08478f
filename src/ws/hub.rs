use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::models::encode;
use super::connection::{ClientHandle, ConnectionId, Payload};

type Members = HashMap<ConnectionId, ClientHandle>;

/// Registry of live connections per session and the fan-out point for broadcasts.
///
/// Traversal takes the read lock, registration and eviction take the write
/// lock. The lock is never held across an await, sends into mailboxes are
/// `try_send` only.
#[derive(Debug)]
pub struct Hub {
    mailbox_capacity: usize,
    sessions: RwLock<HashMap<String, Members>>,
}

impl Hub {
    pub fn new(mailbox_capacity: usize) -> Self {
        Self {
            mailbox_capacity: mailbox_capacity.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Members>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Members>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection to its session's member set.
    /// Each handle must be registered exactly once.
    pub fn register(&self, handle: ClientHandle) {
        let mut sessions = self.write();
        let members = sessions.entry(handle.session_id().to_string()).or_default();
        debug!("Registering connection {} for session {}", handle.id(), handle.session_id());
        members.insert(handle.id(), handle);
    }

    /// Remove a connection. Returns false when it was not registered.
    pub fn unregister(&self, session_id: &str, connection_id: ConnectionId) -> bool {
        let mut sessions = self.write();
        remove_member(&mut sessions, session_id, connection_id)
    }

    /// Serialize `message` once and queue it on every member of `session_id`.
    ///
    /// Returns the number of mailboxes it reached. A message that fails to
    /// serialize is dropped and logged.
    pub fn broadcast_to_session<T: Serialize + ?Sized>(&self, session_id: &str, message: &T) -> usize {
        match encode(message) {
            Ok(payload) => self.broadcast_payload(session_id, payload),
            Err(e) => {
                error!("Failed to serialize broadcast for session {}: {}", session_id, e);
                0
            }
        }
    }

    /// Queue an already serialized payload on every member of `session_id`,
    /// evicting members whose mailbox is full or closed.
    pub fn broadcast_payload(&self, session_id: &str, payload: Payload) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let sessions = self.read();
            let Some(members) = sessions.get(session_id) else {
                debug!("No connections for session {}, dropping broadcast", session_id);
                return 0;
            };
            for (id, handle) in members {
                match handle.send(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        warn!("Evicting connection {} from session {}: {}", id, session_id, e);
                        failed.push(*id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut sessions = self.write();
            for id in failed {
                remove_member(&mut sessions, session_id, id);
            }
        }
        delivered
    }

    pub fn session_count(&self) -> usize {
        self.read().len()
    }

    pub fn connection_count(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    pub fn member_count(&self, session_id: &str) -> usize {
        self.read().get(session_id).map_or(0, HashMap::len)
    }
}

// Dropping the removed handle closes that connection's mailbox.
fn remove_member(sessions: &mut HashMap<String, Members>, session_id: &str, connection_id: ConnectionId) -> bool {
    let Some(members) = sessions.get_mut(session_id) else {
        return false;
    };
    let removed = members.remove(&connection_id).is_some();
    if members.is_empty() {
        sessions.remove(session_id);
        info!("Last connection left session {}, registry entry removed", session_id);
    }
    removed
}
