//! The narrow contract to the transactional store. The core only touches
//! bankrolls and history through this interface; the SQL-backed
//! implementation lives outside this crate.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cards::Card;
use crate::engine::types::{Chips, LoggedAction, SeatId, UserId, Winner};
use crate::stats::StatsIncrement;

pub mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One player's row of a persisted hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandPlayerRecord {
    pub user_id: UserId,
    pub seat: SeatId,
    pub hole_cards: Vec<Card>,
    pub final_hand: Option<String>,
    pub profit: i64,
    pub all_in_ev_profit: Option<i64>,
}

/// The complete record of one hand, dispatched fire-and-forget at
/// completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandRecord {
    pub table_id: String,
    pub hand_no: u64,
    pub blinds: String,
    pub community: Vec<Card>,
    pub pot: Chips,
    pub rake: Chips,
    pub dealer_seat: SeatId,
    pub winners: Vec<Winner>,
    pub actions: Vec<LoggedAction>,
    pub players: Vec<HandPlayerRecord>,
    pub completed_at: DateTime<Utc>,
}

/// Transactional bankroll + fire-and-forget history sink.
///
/// Debits are atomic: `deduct_buy_in` either moves the full amount or
/// nothing. `record_hand` and `increment_stats` may fail without affecting
/// gameplay; callers log and drop.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Atomically debit a buy-in. Returns false when the balance is short.
    async fn deduct_buy_in(&self, user_id: &str, amount: Chips) -> Result<bool, StorageError>;

    /// Credit chips back to a bankroll (leaving a table, refunds).
    async fn cash_out(
        &self,
        user_id: &str,
        amount: Chips,
        table_id: Option<&str>,
    ) -> Result<(), StorageError>;

    async fn balance(&self, user_id: &str) -> Result<Chips, StorageError>;

    async fn record_hand(&self, record: HandRecord) -> Result<(), StorageError>;

    async fn increment_stats(
        &self,
        increments: HashMap<UserId, StatsIncrement>,
    ) -> Result<(), StorageError>;
}
