//! Per-blind FIFO matchmaking queues, drained on enqueue and on a periodic
//! tick.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;

use super::manager::TableManager;
use crate::config::ServerConfig;
use crate::engine::types::{TableStakes, UserId};
use crate::session::protocol::ErrorPayload;
use crate::session::SessionHandle;
use crate::storage::Storage;

const LOG_TARGET: &str = "table::matchmaking";
const DRAIN_INTERVAL_MS: u64 = 500;
/// Queue depth that justifies opening an extra table.
const OVERFLOW_THRESHOLD: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct QueueKey {
    blinds: String,
    is_fast_fold: bool,
}

#[derive(Clone)]
struct QueueEntry {
    user_id: UserId,
    name: String,
    avatar: Option<String>,
    is_bot: bool,
    session: Arc<SessionHandle>,
    queued_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub blinds: String,
    pub is_fast_fold: bool,
    pub waiting: usize,
    pub average_wait_ms: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("invalid blinds format")]
    InvalidBlinds,
    #[error("already queued")]
    AlreadyQueued,
    #[error("already seated at a table")]
    AlreadySeated,
}

pub struct MatchmakingPool {
    queues: Mutex<HashMap<QueueKey, VecDeque<QueueEntry>>>,
    manager: Arc<TableManager>,
    storage: Arc<dyn Storage>,
    maintenance: Arc<AtomicBool>,
    config: Arc<ServerConfig>,
    notify: Notify,
}

impl MatchmakingPool {
    pub fn new(
        config: Arc<ServerConfig>,
        manager: Arc<TableManager>,
        storage: Arc<dyn Storage>,
        maintenance: Arc<AtomicBool>,
    ) -> Arc<Self> {
        let pool = Arc::new(Self {
            queues: Mutex::new(HashMap::new()),
            manager,
            storage,
            maintenance,
            config,
            notify: Notify::new(),
        });
        tokio::spawn(Arc::clone(&pool).run());
        pool
    }

    async fn run(self: Arc<Self>) {
        let mut tick = tokio::time::interval(Duration::from_millis(DRAIN_INTERVAL_MS));
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = self.notify.notified() => {}
            }
            self.drain().await;
        }
    }

    /// Enqueue a player; returns their 1-based queue position.
    pub fn join(
        &self,
        session: Arc<SessionHandle>,
        blinds: &str,
        is_fast_fold: bool,
    ) -> Result<usize, JoinError> {
        if ServerConfig::parse_blinds(blinds).is_none() {
            return Err(JoinError::InvalidBlinds);
        }
        if self.manager.table_of_player(&session.user_id).is_some() {
            return Err(JoinError::AlreadySeated);
        }
        let mut queues = self.queues.lock();
        if queues
            .values()
            .any(|q| q.iter().any(|e| e.user_id == session.user_id))
        {
            return Err(JoinError::AlreadyQueued);
        }
        let key = QueueKey {
            blinds: blinds.to_string(),
            is_fast_fold,
        };
        let queue = queues.entry(key).or_default();
        queue.push_back(QueueEntry {
            user_id: session.user_id.clone(),
            name: session.name.clone(),
            avatar: session.avatar.clone(),
            is_bot: session.is_bot,
            session,
            queued_at: Utc::now(),
        });
        let position = queue.len();
        drop(queues);
        self.notify.notify_one();
        Ok(position)
    }

    /// Remove a player from every queue (leave or disconnect).
    pub fn leave(&self, user_id: &str) {
        let mut queues = self.queues.lock();
        for queue in queues.values_mut() {
            queue.retain(|e| e.user_id != user_id);
        }
    }

    pub fn status(&self) -> Vec<QueueStatus> {
        let now = Utc::now();
        self.queues
            .lock()
            .iter()
            .map(|(key, queue)| {
                let total_wait: i64 = queue
                    .iter()
                    .map(|e| (now - e.queued_at).num_milliseconds().max(0))
                    .sum();
                QueueStatus {
                    blinds: key.blinds.clone(),
                    is_fast_fold: key.is_fast_fold,
                    waiting: queue.len(),
                    average_wait_ms: if queue.is_empty() {
                        0
                    } else {
                        (total_wait / queue.len() as i64) as u64
                    },
                }
            })
            .collect()
    }

    async fn drain(&self) {
        if self.maintenance.load(Ordering::Relaxed) {
            return;
        }
        let keys: Vec<QueueKey> = self.queues.lock().keys().cloned().collect();
        for key in keys {
            self.drain_queue(&key).await;
        }
    }

    async fn drain_queue(&self, key: &QueueKey) {
        let Some((sb, bb)) = ServerConfig::parse_blinds(&key.blinds) else {
            return;
        };
        let stakes = TableStakes {
            small_blind: sb,
            big_blind: bb,
        };
        let buy_in = bb * self.config.buy_in_bb;

        loop {
            let waiting = self
                .queues
                .lock()
                .get(key)
                .map(|q| q.len())
                .unwrap_or(0);
            if waiting == 0 {
                return;
            }

            // One table per pass: an existing seat if any, else a new table
            // when nothing matches or the queue can fill one on its own.
            let table = match self
                .manager
                .find_available_table(&key.blinds, key.is_fast_fold, None)
            {
                Some(table) => table,
                None => {
                    let none_exist = self
                        .manager
                        .public_table_count(&key.blinds, key.is_fast_fold)
                        == 0;
                    if none_exist || waiting >= OVERFLOW_THRESHOLD {
                        self.manager.create_table(stakes, key.is_fast_fold)
                    } else {
                        return;
                    }
                }
            };

            let mut seated_any = false;
            while table.has_available_seat() {
                let Some(entry) = self.pop_head(key) else {
                    break;
                };
                if !entry.session.is_connected() {
                    tracing::debug!(
                        target: LOG_TARGET,
                        user_id = %entry.user_id,
                        "dropping disconnected queue entry"
                    );
                    continue;
                }
                match self.storage.deduct_buy_in(&entry.user_id, buy_in).await {
                    Ok(true) => {}
                    Ok(false) => {
                        entry.session.send(
                            "table:error",
                            ErrorPayload {
                                message: "Insufficient balance for buy-in",
                            },
                        );
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(target: LOG_TARGET, %err, "buy-in debit failed");
                        self.requeue(key, entry);
                        return;
                    }
                }
                let seated = self
                    .manager
                    .seat_player(
                        &table,
                        entry.user_id.clone(),
                        entry.name.clone(),
                        entry.avatar.clone(),
                        entry.is_bot,
                        Some(Arc::clone(&entry.session)),
                        buy_in,
                    )
                    .await;
                match seated {
                    Ok(_) => {
                        seated_any = true;
                        entry.session.send(
                            "matchmaking:table_assigned",
                            serde_json::json!({ "tableId": table.id }),
                        );
                    }
                    Err(err) => {
                        // Compensate the debit before the entry goes back.
                        tracing::warn!(
                            target: LOG_TARGET,
                            user_id = %entry.user_id,
                            %err,
                            "seating failed; refunding buy-in"
                        );
                        if let Err(err) =
                            self.storage.cash_out(&entry.user_id, buy_in, None).await
                        {
                            tracing::error!(
                                target: LOG_TARGET,
                                user_id = %entry.user_id,
                                %err,
                                "refund failed"
                            );
                        }
                        self.requeue(key, entry);
                        return;
                    }
                }
            }

            if !seated_any {
                return;
            }
        }
    }

    fn pop_head(&self, key: &QueueKey) -> Option<QueueEntry> {
        self.queues.lock().get_mut(key)?.pop_front()
    }

    fn requeue(&self, key: &QueueKey, entry: QueueEntry) {
        self.queues
            .lock()
            .entry(key.clone())
            .or_default()
            .push_back(entry);
    }
}
