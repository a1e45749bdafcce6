//! Table registry, per-player table tracking, and the manager worker that
//! consumes reassignment and lifecycle messages from tables.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};

use super::instance::{Table, TableConfig, TableHandle, TableId, TableInfo, TableMsg};
use super::seats::SeatError;
use crate::config::ServerConfig;
use crate::engine::types::{Chips, SeatId, TableStakes, UserId};
use crate::session::SessionHandle;
use crate::storage::Storage;

const LOG_TARGET: &str = "table::manager";
const INVITE_CODE_LEN: usize = 6;

/// Messages tables send back to the manager.
pub enum ManagerMsg {
    /// Fast-fold re-seating: the player keeps their chips and moves to a
    /// different table of the same blinds.
    Reassign {
        user_id: UserId,
        name: String,
        avatar: Option<String>,
        is_bot: bool,
        session: Option<Arc<SessionHandle>>,
        chips: Chips,
        blinds: String,
        exclude_table: TableId,
    },
    PlayerLeftTable {
        user_id: UserId,
        table_id: TableId,
    },
    TableEmpty {
        table_id: TableId,
    },
}

pub struct TableManager {
    tables: DashMap<TableId, TableHandle>,
    player_to_table: DashMap<UserId, TableId>,
    invite_codes: DashMap<String, TableId>,
    config: Arc<ServerConfig>,
    storage: Arc<dyn Storage>,
    maintenance: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<ManagerMsg>,
}

impl TableManager {
    pub fn new(
        config: Arc<ServerConfig>,
        storage: Arc<dyn Storage>,
        maintenance: Arc<AtomicBool>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            tables: DashMap::new(),
            player_to_table: DashMap::new(),
            invite_codes: DashMap::new(),
            config,
            storage,
            maintenance,
            tx,
        });
        tokio::spawn(Self::run(Arc::clone(&manager), rx));
        manager
    }

    async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<ManagerMsg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                ManagerMsg::Reassign {
                    user_id,
                    name,
                    avatar,
                    is_bot,
                    session,
                    chips,
                    blinds,
                    exclude_table,
                } => {
                    self.reassign(
                        user_id,
                        name,
                        avatar,
                        is_bot,
                        session,
                        chips,
                        &blinds,
                        &exclude_table,
                    )
                    .await;
                }
                ManagerMsg::PlayerLeftTable { user_id, table_id } => {
                    self.player_to_table
                        .remove_if(&user_id, |_, mapped| *mapped == table_id);
                }
                ManagerMsg::TableEmpty { table_id } => {
                    self.remove_table(&table_id);
                }
            }
        }
    }

    fn table_config(&self, stakes: TableStakes, is_fast_fold: bool, is_private: bool) -> TableConfig {
        TableConfig {
            stakes,
            rake: crate::engine::types::RakeConfig {
                percent: self.config.rake_percent,
                cap_bb: self.config.rake_cap_bb,
            },
            is_fast_fold,
            is_private,
            action_timeout_ms: self.config.action_timeout_ms,
            action_animation_ms: self.config.action_animation_ms,
            street_transition_ms: self.config.street_transition_ms,
            result_display_ms: self.config.result_display_ms,
            post_hand_ms: self.config.post_hand_ms,
        }
    }

    pub fn create_table(&self, stakes: TableStakes, is_fast_fold: bool) -> TableHandle {
        let handle = Table::spawn(
            self.table_config(stakes, is_fast_fold, false),
            Arc::clone(&self.storage),
            Arc::clone(&self.maintenance),
            self.tx.clone(),
            None,
        );
        self.tables.insert(handle.id.clone(), handle.clone());
        handle
    }

    pub fn create_private_table(&self, stakes: TableStakes) -> TableHandle {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(INVITE_CODE_LEN)
            .map(|c| (c as char).to_ascii_uppercase())
            .collect();
        let handle = Table::spawn(
            self.table_config(stakes, false, true),
            Arc::clone(&self.storage),
            Arc::clone(&self.maintenance),
            self.tx.clone(),
            Some(code.clone()),
        );
        self.tables.insert(handle.id.clone(), handle.clone());
        self.invite_codes.insert(code, handle.id.clone());
        handle
    }

    pub fn remove_table(&self, table_id: &str) {
        if let Some((_, handle)) = self.tables.remove(table_id) {
            if let Some(code) = &handle.invite_code {
                self.invite_codes.remove(code);
            }
            handle.send(TableMsg::Shutdown);
            tracing::info!(target: LOG_TARGET, table_id, "table removed");
        }
    }

    /// A public table of these attributes with a free seat, preferring any
    /// table other than `exclude`.
    pub fn find_available_table(
        &self,
        blinds: &str,
        is_fast_fold: bool,
        exclude: Option<&str>,
    ) -> Option<TableHandle> {
        let mut fallback = None;
        for entry in self.tables.iter() {
            let t = entry.value();
            if t.is_private
                || t.is_fast_fold != is_fast_fold
                || t.blinds() != blinds
                || !t.has_available_seat()
            {
                continue;
            }
            if exclude == Some(t.id.as_str()) {
                fallback = Some(t.clone());
                continue;
            }
            return Some(t.clone());
        }
        fallback
    }

    pub fn get_or_create_table(
        &self,
        stakes: TableStakes,
        is_fast_fold: bool,
        exclude: Option<&str>,
    ) -> TableHandle {
        self.find_available_table(&stakes.label(), is_fast_fold, exclude)
            .unwrap_or_else(|| self.create_table(stakes, is_fast_fold))
    }

    pub fn table_by_invite(&self, code: &str) -> Option<TableHandle> {
        let id = self.invite_codes.get(code)?.value().clone();
        self.table(&id)
    }

    pub fn table_of_player(&self, user_id: &str) -> Option<TableHandle> {
        let id = self.player_to_table.get(user_id)?.value().clone();
        self.table(&id)
    }

    pub fn table(&self, table_id: &str) -> Option<TableHandle> {
        self.tables.get(table_id).map(|t| t.value().clone())
    }

    /// Seat a player on `table`. The player-to-table index is written before
    /// the seat message so a racing second join sees the residency; it is
    /// rolled back if seating fails.
    pub async fn seat_player(
        &self,
        table: &TableHandle,
        user_id: UserId,
        name: String,
        avatar: Option<String>,
        is_bot: bool,
        session: Option<Arc<SessionHandle>>,
        chips: Chips,
    ) -> Result<SeatId, SeatError> {
        if self.player_to_table.contains_key(&user_id) {
            return Err(SeatError::AlreadySeated);
        }
        self.player_to_table
            .insert(user_id.clone(), table.id.clone());
        let (reply, rx) = oneshot::channel();
        table.send(TableMsg::SeatPlayer {
            user_id: user_id.clone(),
            name,
            avatar,
            is_bot,
            session,
            chips,
            preferred: None,
            reply,
        });
        let result = rx.await.unwrap_or(Err(SeatError::TableFull));
        if result.is_err() {
            self.player_to_table
                .remove_if(&user_id, |_, mapped| *mapped == table.id);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn reassign(
        &self,
        user_id: UserId,
        name: String,
        avatar: Option<String>,
        is_bot: bool,
        session: Option<Arc<SessionHandle>>,
        chips: Chips,
        blinds: &str,
        exclude_table: &str,
    ) {
        // The old residency is released before the move.
        self.player_to_table.remove(&user_id);
        let Some((sb, bb)) = ServerConfig::parse_blinds(blinds) else {
            return;
        };
        let stakes = TableStakes {
            small_blind: sb,
            big_blind: bb,
        };
        let table = self.get_or_create_table(stakes, true, Some(exclude_table));
        let seated = self
            .seat_player(
                &table,
                user_id.clone(),
                name,
                avatar,
                is_bot,
                session.clone(),
                chips,
            )
            .await;
        match seated {
            Ok(seat) => {
                tracing::info!(
                    target: LOG_TARGET,
                    user_id = %user_id,
                    table_id = %table.id,
                    seat,
                    "fast-fold reassignment"
                );
                if let Some(session) = session {
                    session.send(
                        "table:change",
                        serde_json::json!({ "tableId": table.id, "seat": seat }),
                    );
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    user_id = %user_id,
                    %err,
                    "reassignment failed; cashing out"
                );
                if chips > 0 {
                    if let Err(err) = self.storage.cash_out(&user_id, chips, None).await {
                        tracing::error!(
                            target: LOG_TARGET,
                            user_id = %user_id,
                            %err,
                            "cash-out after failed reassignment"
                        );
                    }
                }
                if let Some(session) = session {
                    session.send_empty("table:left");
                }
            }
        }
    }

    pub fn public_table_count(&self, blinds: &str, is_fast_fold: bool) -> usize {
        self.tables
            .iter()
            .filter(|t| {
                !t.is_private && t.is_fast_fold == is_fast_fold && t.blinds() == blinds
            })
            .count()
    }

    pub async fn tables_info(&self) -> Vec<TableInfo> {
        let handles: Vec<TableHandle> = self.tables.iter().map(|t| t.value().clone()).collect();
        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Some(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos
    }

    /// Route a message to the table a player is seated at.
    pub fn send_to_players_table(&self, user_id: &str, msg: TableMsg) -> bool {
        match self.table_of_player(user_id) {
            Some(table) => {
                table.send(msg);
                true
            }
            None => false,
        }
    }
}
