//! In-process store: DashMap-backed bankrolls, bounded history, cached stats.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{HandRecord, Storage, StorageError};
use crate::engine::types::{Chips, UserId};
use crate::stats::StatsIncrement;

const HISTORY_CAP: usize = 10_000;

/// The default store: every bankroll starts at `starting_balance` on first
/// sight, debits are atomic per user entry.
pub struct MemoryStore {
    starting_balance: Chips,
    balances: DashMap<UserId, Chips>,
    hands: Mutex<Vec<HandRecord>>,
    stats: DashMap<UserId, StatsIncrement>,
}

impl MemoryStore {
    pub fn new(starting_balance: Chips) -> Self {
        Self {
            starting_balance,
            balances: DashMap::new(),
            hands: Mutex::new(Vec::new()),
            stats: DashMap::new(),
        }
    }

    pub fn hand_count(&self) -> usize {
        self.hands.lock().len()
    }

    pub fn stats_for(&self, user_id: &str) -> Option<StatsIncrement> {
        self.stats.get(user_id).map(|s| s.clone())
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn deduct_buy_in(&self, user_id: &str, amount: Chips) -> Result<bool, StorageError> {
        let mut entry = self
            .balances
            .entry(user_id.to_string())
            .or_insert(self.starting_balance);
        if *entry < amount {
            return Ok(false);
        }
        *entry -= amount;
        Ok(true)
    }

    async fn cash_out(
        &self,
        user_id: &str,
        amount: Chips,
        _table_id: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut entry = self
            .balances
            .entry(user_id.to_string())
            .or_insert(self.starting_balance);
        *entry += amount;
        Ok(())
    }

    async fn balance(&self, user_id: &str) -> Result<Chips, StorageError> {
        let entry = self
            .balances
            .entry(user_id.to_string())
            .or_insert(self.starting_balance);
        Ok(*entry)
    }

    async fn record_hand(&self, record: HandRecord) -> Result<(), StorageError> {
        let mut hands = self.hands.lock();
        if hands.len() >= HISTORY_CAP {
            hands.remove(0);
        }
        hands.push(record);
        Ok(())
    }

    async fn increment_stats(
        &self,
        increments: HashMap<UserId, StatsIncrement>,
    ) -> Result<(), StorageError> {
        for (user, inc) in increments {
            let mut entry = self.stats.entry(user).or_default();
            entry.hands_played += inc.hands_played;
            entry.vpip += inc.vpip;
            entry.pfr += inc.pfr;
            entry.three_bet += inc.three_bet;
            entry.four_bet += inc.four_bet;
            entry.cbet_opportunities += inc.cbet_opportunities;
            entry.cbets += inc.cbets;
            entry.fold_to_cbet_opportunities += inc.fold_to_cbet_opportunities;
            entry.folds_to_cbet += inc.folds_to_cbet;
            entry.saw_flop += inc.saw_flop;
            entry.went_to_showdown += inc.went_to_showdown;
            entry.won_at_showdown += inc.won_at_showdown;
            entry.aggressive_actions += inc.aggressive_actions;
            entry.afq_actions += inc.afq_actions;
            entry.profit += inc.profit;
            if let Some(ev) = inc.all_in_ev_profit {
                entry.all_in_ev_profit = Some(entry.all_in_ev_profit.unwrap_or(0) + ev);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buy_in_is_atomic_and_bounded_by_balance() {
        let store = MemoryStore::new(100);
        assert!(store.deduct_buy_in("u1", 60).await.unwrap());
        assert!(!store.deduct_buy_in("u1", 60).await.unwrap());
        assert_eq!(store.balance("u1").await.unwrap(), 40);
        store.cash_out("u1", 25, None).await.unwrap();
        assert_eq!(store.balance("u1").await.unwrap(), 65);
    }

    #[tokio::test]
    async fn unseen_users_get_the_starting_bankroll() {
        let store = MemoryStore::new(500);
        assert_eq!(store.balance("fresh").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn stats_accumulate_across_hands() {
        let store = MemoryStore::new(0);
        let inc = StatsIncrement {
            hands_played: 1,
            vpip: 1,
            profit: -5,
            ..Default::default()
        };
        store
            .increment_stats(HashMap::from([("u".to_string(), inc.clone())]))
            .await
            .unwrap();
        store
            .increment_stats(HashMap::from([("u".to_string(), inc)]))
            .await
            .unwrap();
        let total = store.stats_for("u").unwrap();
        assert_eq!(total.hands_played, 2);
        assert_eq!(total.vpip, 2);
        assert_eq!(total.profit, -10);
    }
}
