//! Session Registry - sessioni WebSocket attive e relative sottoscrizioni alle chat
//!
//! Sostituisce la coppia UserMap/ChatMap: un utente può avere più sessioni
//! (multi-device) e ogni sessione ha il proprio insieme di stanze.

use crate::core::auth::AuthUser;
use crate::dtos::ServerEvent;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

pub type SessionId = u64;

/// Segnali interni verso il task di scrittura di una sessione
#[derive(Debug, Clone)]
pub enum InternalSignal {
    Event(Arc<ServerEvent>),
    Shutdown,
}

/// Cheap, cloneable handle to one live connection.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    user: Arc<AuthUser>,
    tx: UnboundedSender<InternalSignal>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    pub fn user_id(&self) -> i32 {
        self.user.user_id
    }

    /// Queues a signal for the writer task. Returns `false` when the
    /// connection is already gone.
    pub fn send(&self, signal: InternalSignal) -> bool {
        self.tx.send(signal).is_ok()
    }

    /// Resolves once the writer side of the connection has gone away
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

struct SessionEntry {
    handle: SessionHandle,
    rooms: HashSet<i32>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    sessions: DashMap<SessionId, SessionEntry>,
    by_user: DashMap<i32, HashSet<SessionId>>,
    by_chat: DashMap<i32, HashSet<SessionId>>,
}

/// Concurrent map of live sessions.
///
/// Lock order is always `sessions` before `by_chat`; lookups used for fan-out
/// copy the id set out of the index before touching `sessions`.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session for an authenticated user.
    /// The session starts unsubscribed from every chat.
    #[instrument(skip(self, user, tx), fields(user_id = user.user_id))]
    pub fn register(&self, user: AuthUser, tx: UnboundedSender<InternalSignal>) -> SessionHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let user_id = user.user_id;
        let handle = SessionHandle {
            id,
            user: Arc::new(user),
            tx,
        };

        self.inner.sessions.insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                rooms: HashSet::new(),
            },
        );
        self.inner.by_user.entry(user_id).or_default().insert(id);

        info!(session_id = id, total = self.inner.sessions.len(), "Session registered");
        handle
    }

    /// Removes a session and all its room subscriptions.
    ///
    /// Only the first call for a given session does any work and returns `true`.
    #[instrument(skip(self))]
    pub fn unregister(&self, session_id: SessionId) -> bool {
        let Some((_, entry)) = self.inner.sessions.remove(&session_id) else {
            debug!("Session already unregistered");
            return false;
        };

        let user_id = entry.handle.user_id();
        if let Some(mut ids) = self.inner.by_user.get_mut(&user_id) {
            ids.remove(&session_id);
        }
        self.inner.by_user.remove_if(&user_id, |_, ids| ids.is_empty());

        for chat_id in &entry.rooms {
            self.remove_from_room(*chat_id, session_id);
        }

        info!(
            user_id,
            rooms = entry.rooms.len(),
            total = self.inner.sessions.len(),
            "Session unregistered"
        );
        true
    }

    /// Subscribes a session to a chat room. Idempotent.
    ///
    /// Returns `false` when the session does not exist (anymore).
    #[instrument(skip(self))]
    pub fn subscribe(&self, session_id: SessionId, chat_id: i32) -> bool {
        let Some(mut entry) = self.inner.sessions.get_mut(&session_id) else {
            warn!("Subscribe requested for unknown session");
            return false;
        };
        entry.rooms.insert(chat_id);
        // l'entry resta bloccata finché la stanza non è indicizzata: una
        // unregister concorrente vede sempre entrambe le modifiche o nessuna
        self.inner.by_chat.entry(chat_id).or_default().insert(session_id);
        debug!("Session subscribed to chat");
        true
    }

    /// Drops the room subscription of every session of `user_id`.
    /// Used when a user stops being a member of the chat.
    #[instrument(skip(self))]
    pub fn unsubscribe_user(&self, chat_id: i32, user_id: i32) -> usize {
        let mut removed = 0;
        for session_id in self.session_ids_for(user_id) {
            if let Some(mut entry) = self.inner.sessions.get_mut(&session_id) {
                if entry.rooms.remove(&chat_id) {
                    self.remove_from_room(chat_id, session_id);
                    removed += 1;
                }
            }
        }
        debug!(removed, "User sessions unsubscribed from chat");
        removed
    }

    /// Live sessions of a user at this instant
    pub fn sessions_for(&self, user_id: i32) -> Vec<SessionHandle> {
        self.handles(self.session_ids_for(user_id))
    }

    /// Sessions currently subscribed to a chat room at this instant
    pub fn sessions_subscribed_to(&self, chat_id: i32) -> Vec<SessionHandle> {
        let ids: Vec<SessionId> = self
            .inner
            .by_chat
            .get(&chat_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        self.handles(ids)
    }

    /// Whether the given session is subscribed to the chat
    pub fn is_subscribed(&self, session_id: SessionId, chat_id: i32) -> bool {
        self.inner
            .sessions
            .get(&session_id)
            .map(|entry| entry.rooms.contains(&chat_id))
            .unwrap_or(false)
    }

    /// Sends an event to every session subscribed to the chat.
    /// Sessions that went away in the meantime are skipped.
    pub fn broadcast_to_chat(&self, chat_id: i32, event: Arc<ServerEvent>) -> usize {
        let delivered = Self::deliver(self.sessions_subscribed_to(chat_id), event);
        debug!(chat_id, delivered, "Event broadcast to chat room");
        delivered
    }

    /// Sends an event to every live session of a user, subscribed or not
    pub fn send_to_user(&self, user_id: i32, event: Arc<ServerEvent>) -> usize {
        let delivered = Self::deliver(self.sessions_for(user_id), event);
        debug!(user_id, delivered, "Event sent to user sessions");
        delivered
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_user_online(&self, user_id: i32) -> bool {
        self.inner.by_user.contains_key(&user_id)
    }

    fn deliver(sessions: Vec<SessionHandle>, event: Arc<ServerEvent>) -> usize {
        sessions
            .into_iter()
            .filter(|session| session.send(InternalSignal::Event(event.clone())))
            .count()
    }

    fn session_ids_for(&self, user_id: i32) -> Vec<SessionId> {
        self.inner
            .by_user
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn handles(&self, ids: Vec<SessionId>) -> Vec<SessionHandle> {
        let mut handles: Vec<SessionHandle> = ids
            .into_iter()
            .filter_map(|id| self.inner.sessions.get(&id).map(|e| e.handle.clone()))
            .collect();
        handles.sort_by_key(|h| h.id);
        handles
    }

    fn remove_from_room(&self, chat_id: i32, session_id: SessionId) {
        if let Some(mut ids) = self.inner.by_chat.get_mut(&chat_id) {
            ids.remove(&session_id);
        }
        self.inner.by_chat.remove_if(&chat_id, |_, ids| ids.is_empty());
    }
}
