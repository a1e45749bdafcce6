//! Connected-session bookkeeping and authentication.

pub mod protocol;

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::engine::types::UserId;
use protocol::WireMessage;

pub type SessionId = Uuid;

const LOG_TARGET: &str = "session";

/// A connected client. Tables and the matchmaking pool hold this as a weak,
/// id-keyed routing reference; seat ownership stays with the table.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: SessionId,
    pub user_id: UserId,
    pub name: String,
    pub avatar: Option<String>,
    pub is_bot: bool,
    tx: mpsc::UnboundedSender<WireMessage>,
}

impl SessionHandle {
    pub fn new(
        user_id: UserId,
        name: String,
        avatar: Option<String>,
        is_bot: bool,
        tx: mpsc::UnboundedSender<WireMessage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            avatar,
            is_bot,
            tx,
        })
    }

    /// Queue an outbound message; delivery failures mean the socket is gone
    /// and are surfaced through `is_connected`.
    pub fn send(&self, event: &str, payload: impl Serialize) {
        let _ = self.tx.send(WireMessage::new(event, payload));
    }

    pub fn send_empty(&self, event: &str) {
        let _ = self.tx.send(WireMessage::empty(event));
    }

    pub fn send_wire(&self, msg: WireMessage) {
        let _ = self.tx.send(msg);
    }

    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// All live sessions, addressable by session id and by user.
#[derive(Default)]
pub struct SessionRegistry {
    by_id: DashMap<SessionId, Arc<SessionHandle>>,
    by_user: DashMap<UserId, SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly authenticated session. An existing session for the
    /// same user is displaced (single active connection per user).
    pub fn insert(&self, session: Arc<SessionHandle>) -> Option<Arc<SessionHandle>> {
        let displaced = self
            .by_user
            .insert(session.user_id.clone(), session.id)
            .and_then(|old_id| self.by_id.remove(&old_id).map(|(_, s)| s));
        if displaced.is_some() {
            tracing::info!(
                target: LOG_TARGET,
                user_id = %session.user_id,
                "displacing previous session for user"
            );
        }
        self.by_id.insert(session.id, session);
        displaced
    }

    pub fn remove(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        let removed = self.by_id.remove(&id).map(|(_, s)| s);
        if let Some(session) = &removed {
            // Only clear the user index if it still points at this session.
            self.by_user
                .remove_if(&session.user_id, |_, mapped| *mapped == id);
        }
        removed
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        self.by_id.get(&id).map(|s| Arc::clone(s.value()))
    }

    pub fn for_user(&self, user_id: &str) -> Option<Arc<SessionHandle>> {
        let id = *self.by_user.get(user_id)?;
        self.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Broadcast to every connected session (maintenance, announcements).
    pub fn broadcast(&self, msg: &WireMessage) {
        for entry in self.by_id.iter() {
            entry.value().send_wire(msg.clone());
        }
    }
}

/// Pure token-to-user verification; the production verifier lives outside
/// the core.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<UserId>;
}

/// Development verifier: accepts `dev:<user-id>` tokens.
pub struct DevTokenVerifier;

impl TokenVerifier for DevTokenVerifier {
    fn verify(&self, token: &str) -> Option<UserId> {
        let id = token.strip_prefix("dev:")?;
        (!id.is_empty()).then(|| id.to_string())
    }
}

/// Bot credentials map deterministically onto provisioned bot users.
pub fn bot_user_id(bot_name: &str) -> UserId {
    format!("bot:{}", bot_name.trim().to_lowercase().replace(' ', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user: &str) -> (Arc<SessionHandle>, mpsc::UnboundedReceiver<WireMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SessionHandle::new(user.to_string(), user.to_string(), None, false, tx),
            rx,
        )
    }

    #[test]
    fn registry_tracks_by_user_and_displaces_duplicates() {
        let registry = SessionRegistry::new();
        let (a, _rx_a) = session("u1");
        let (b, _rx_b) = session("u1");
        assert!(registry.insert(a.clone()).is_none());
        let displaced = registry.insert(b.clone()).unwrap();
        assert_eq!(displaced.id, a.id);
        assert_eq!(registry.for_user("u1").unwrap().id, b.id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn removing_a_stale_session_keeps_the_new_mapping() {
        let registry = SessionRegistry::new();
        let (a, _rx_a) = session("u1");
        let (b, _rx_b) = session("u1");
        registry.insert(a.clone());
        registry.insert(b.clone());
        // Removing the displaced session must not clear u1 -> b.
        registry.remove(a.id);
        assert_eq!(registry.for_user("u1").unwrap().id, b.id);
    }

    #[test]
    fn dev_tokens_resolve_to_user_ids() {
        let v = DevTokenVerifier;
        assert_eq!(v.verify("dev:alice"), Some("alice".to_string()));
        assert_eq!(v.verify("dev:"), None);
        assert_eq!(v.verify("bearer xyz"), None);
    }

    #[test]
    fn bot_names_map_deterministically() {
        assert_eq!(bot_user_id("Card Shark"), "bot:card-shark");
        assert_eq!(bot_user_id("Card Shark"), bot_user_id("card shark"));
    }

    #[test]
    fn disconnected_sessions_report_closed() {
        let (session, rx) = session("u2");
        assert!(session.is_connected());
        drop(rx);
        assert!(!session.is_connected());
    }
}
