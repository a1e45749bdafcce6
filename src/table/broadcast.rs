//! Per-table room fan-out with a bounded message log.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::protocol::WireMessage;
use crate::session::{SessionHandle, SessionId};

const LOG_CAP: usize = 200;

#[derive(Clone, Debug, Serialize)]
pub struct LoggedMessage {
    pub at: DateTime<Utc>,
    pub event: String,
}

/// Every session joined to one table: seated players and spectators alike.
/// Ordering is FIFO per sender; payloads are opaque here.
pub struct Room {
    members: Vec<Arc<SessionHandle>>,
    log: VecDeque<LoggedMessage>,
}

impl Room {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            log: VecDeque::with_capacity(LOG_CAP),
        }
    }

    pub fn join(&mut self, session: Arc<SessionHandle>) {
        self.members.retain(|m| m.id != session.id);
        self.members.push(session);
    }

    pub fn leave(&mut self, session_id: SessionId) {
        self.members.retain(|m| m.id != session_id);
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.members.iter().any(|m| m.id == session_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &Arc<SessionHandle>> {
        self.members.iter()
    }

    /// Fan a message out to the whole room; dead sessions are purged as they
    /// are discovered.
    pub fn emit(&mut self, event: &str, payload: impl Serialize) {
        let msg = WireMessage::new(event, payload);
        self.record(event);
        self.members.retain(|m| {
            m.send_wire(msg.clone());
            m.is_connected()
        });
    }

    /// Unicast to one session; recorded in the same log.
    pub fn emit_to(&mut self, session: &SessionHandle, event: &str, payload: impl Serialize) {
        self.record(event);
        session.send(event, payload);
    }

    /// Fan-out where each member gets its own payload (masked snapshots).
    pub fn emit_personalized<P, F>(&mut self, event: &str, build: F)
    where
        P: Serialize,
        F: Fn(&SessionHandle) -> P,
    {
        self.record(event);
        self.members.retain(|m| {
            m.send(event, build(m));
            m.is_connected()
        });
    }

    fn record(&mut self, event: &str) {
        if self.log.len() == LOG_CAP {
            self.log.pop_front();
        }
        self.log.push_back(LoggedMessage {
            at: Utc::now(),
            event: event.to_string(),
        });
    }

    /// Most recent messages, oldest first.
    pub fn recent_messages(&self) -> Vec<LoggedMessage> {
        self.log.iter().cloned().collect()
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn member(user: &str) -> (
        Arc<SessionHandle>,
        mpsc::UnboundedReceiver<WireMessage>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SessionHandle::new(user.to_string(), user.to_string(), None, false, tx),
            rx,
        )
    }

    #[test]
    fn emit_reaches_every_member_in_order() {
        let mut room = Room::new();
        let (a, mut rx_a) = member("a");
        let (b, mut rx_b) = member("b");
        room.join(a);
        room.join(b);
        room.emit("one", serde_json::json!({"n": 1}));
        room.emit("two", serde_json::json!({"n": 2}));
        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.try_recv().unwrap().event, "one");
            assert_eq!(rx.try_recv().unwrap().event, "two");
        }
    }

    #[test]
    fn dead_members_are_purged_on_broadcast() {
        let mut room = Room::new();
        let (a, rx_a) = member("a");
        let (b, _rx_b) = member("b");
        room.join(a);
        room.join(b);
        drop(rx_a);
        room.emit("tick", ());
        assert_eq!(room.members().count(), 1);
    }

    #[test]
    fn log_is_bounded() {
        let mut room = Room::new();
        for i in 0..(LOG_CAP + 50) {
            room.emit(&format!("e{i}"), ());
        }
        let log = room.recent_messages();
        assert_eq!(log.len(), LOG_CAP);
        assert_eq!(log.first().unwrap().event, "e50");
        assert_eq!(log.last().unwrap().event, format!("e{}", LOG_CAP + 49));
    }

    #[test]
    fn rejoining_does_not_duplicate_membership() {
        let mut room = Room::new();
        let (a, mut rx_a) = member("a");
        room.join(a.clone());
        room.join(a);
        room.emit("once", ());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_a.try_recv().is_err());
    }
}
