//! Timer scheduling with generation counters.
//!
//! Each key holds a monotone generation; scheduling bumps it and spawns a
//! sleep task that posts a `TimerFired` message carrying the generation it
//! was scheduled under. A fire whose generation no longer matches is stale
//! and dropped on receipt, which is the whole defence against late-fire
//! races.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use super::instance::TableMsg;
use crate::engine::types::SeatId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerKey {
    /// The per-decision countdown; expiry injects a TIMEOUT command.
    Action,
    /// Short pause after a visible action before the next prompt.
    Animation,
    /// All-in board runout pacing.
    RunOut,
    /// Pause between a street-closing action and the board reveal.
    StreetTransition,
    /// Result display and hand-to-hand spacing.
    NextHand,
}

/// The decision currently awaited, kept for observability.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PendingAction {
    pub seat: SeatId,
    pub timeout_ms: u64,
}

pub struct ActionController {
    tx: mpsc::UnboundedSender<TableMsg>,
    generations: HashMap<TimerKey, u64>,
    pending_action: Option<PendingAction>,
}

impl ActionController {
    pub fn new(tx: mpsc::UnboundedSender<TableMsg>) -> Self {
        Self {
            tx,
            generations: HashMap::new(),
            pending_action: None,
        }
    }

    /// Schedule `key` to fire after `delay_ms`, cancelling any outstanding
    /// timer on the same key by generation bump.
    pub fn schedule(&mut self, key: TimerKey, delay_ms: u64) {
        let generation = self.bump(key);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = tx.send(TableMsg::TimerFired { key, generation });
        });
    }

    /// Start the per-decision countdown for `seat`.
    pub fn schedule_action(&mut self, seat: SeatId, timeout_ms: u64) {
        self.pending_action = Some(PendingAction { seat, timeout_ms });
        self.schedule(TimerKey::Action, timeout_ms);
    }

    /// Whether a fired timer is still current. Stale fires no-op.
    pub fn accept(&self, key: TimerKey, generation: u64) -> bool {
        self.generations.get(&key).copied() == Some(generation)
    }

    /// Cancel one key's outstanding timer.
    pub fn cancel(&mut self, key: TimerKey) {
        self.bump(key);
        if key == TimerKey::Action {
            self.pending_action = None;
        }
    }

    /// Idempotent full cancellation: hand end, table close, departure.
    pub fn cancel_all(&mut self) {
        for key in [
            TimerKey::Action,
            TimerKey::Animation,
            TimerKey::RunOut,
            TimerKey::StreetTransition,
            TimerKey::NextHand,
        ] {
            self.bump(key);
        }
        self.pending_action = None;
    }

    pub fn pending_action(&self) -> Option<PendingAction> {
        self.pending_action
    }

    fn bump(&mut self, key: TimerKey) -> u64 {
        let entry = self.generations.entry(key).or_insert(0);
        *entry += 1;
        *entry
    }
}
