//! The per-table actor: one task, one unbounded mailbox, at most one live
//! hand. Everything that touches a table's state goes through its channel,
//! so no two commands for the same table ever race.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::broadcast::{LoggedMessage, Room};
use super::controller::{ActionController, TimerKey};
use super::manager::ManagerMsg;
use super::seats::{SeatError, SeatManager};
use crate::cards::Deck;
use crate::engine::types::{
    ActionKind, Chips, HandPlayer, PlayerStatus, RakeConfig, SeatId, Street, TableStakes, UserId,
    MAX_SEATS,
};
use crate::engine::processor::process_early_fold;
use crate::engine::{
    next_button, process_command, valid_actions, Command, HandEvent, HandState, PlayerAction,
};
use crate::equity::calculate_all_in_ev_profits;
use crate::session::protocol::{
    ActionRequiredPayload, ActionTakenPayload, AllHoleCardsPayload, ErrorPayload, GameStateView,
    HandCompletePayload, HoleCardsPayload, SeatHoleCards, SeatView, TableJoinedPayload,
};
use crate::session::SessionHandle;
use crate::showdown::evaluate_plo;
use crate::stats::compute_increments;
use crate::storage::{HandPlayerRecord, HandRecord, Storage};

const LOG_TARGET: &str = "table::instance";

pub type TableId = String;

/// Tunables for one table, cut from the server configuration.
#[derive(Clone, Debug)]
pub struct TableConfig {
    pub stakes: TableStakes,
    pub rake: RakeConfig,
    pub is_fast_fold: bool,
    pub is_private: bool,
    pub action_timeout_ms: u64,
    pub action_animation_ms: u64,
    pub street_transition_ms: u64,
    pub result_display_ms: u64,
    pub post_hand_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TablePhase {
    Idle,
    Dealing,
    AwaitingAction,
    StreetTransition,
    PostingResults,
}

/// Messages accepted by a table actor.
pub enum TableMsg {
    SeatPlayer {
        user_id: UserId,
        name: String,
        avatar: Option<String>,
        is_bot: bool,
        session: Option<Arc<SessionHandle>>,
        chips: Chips,
        preferred: Option<SeatId>,
        reply: oneshot::Sender<Result<SeatId, SeatError>>,
    },
    /// Voluntary departure: unseat and cash out at the first safe moment.
    Leave {
        user_id: UserId,
    },
    ClientAction {
        user_id: UserId,
        action: ActionKind,
        amount: Option<Chips>,
    },
    FastFold {
        user_id: UserId,
    },
    Spectate {
        session: Arc<SessionHandle>,
    },
    SessionDisconnected {
        user_id: UserId,
    },
    SessionRebound {
        user_id: UserId,
        session: Arc<SessionHandle>,
    },
    TimerFired {
        key: TimerKey,
        generation: u64,
    },
    MaybeStartHand,
    Info {
        reply: oneshot::Sender<TableInfo>,
    },
    Shutdown,
}

/// Snapshot for the admin surface.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub table_id: TableId,
    pub blinds: String,
    pub is_fast_fold: bool,
    pub is_private: bool,
    pub phase: TablePhase,
    pub seated: usize,
    pub hand_no: u64,
    pub recent_messages: Vec<LoggedMessage>,
}

/// Cloneable address of a running table.
#[derive(Clone)]
pub struct TableHandle {
    pub id: TableId,
    pub stakes: TableStakes,
    pub is_fast_fold: bool,
    pub is_private: bool,
    pub invite_code: Option<String>,
    tx: mpsc::UnboundedSender<TableMsg>,
    seated: Arc<AtomicUsize>,
}

impl TableHandle {
    pub fn blinds(&self) -> String {
        self.stakes.label()
    }

    pub fn seated_count(&self) -> usize {
        self.seated.load(Ordering::Relaxed)
    }

    pub fn has_available_seat(&self) -> bool {
        self.seated_count() < MAX_SEATS
    }

    pub fn send(&self, msg: TableMsg) {
        if self.tx.send(msg).is_err() {
            tracing::warn!(target: LOG_TARGET, table_id = %self.id, "message to dead table");
        }
    }

    pub async fn info(&self) -> Option<TableInfo> {
        let (reply, rx) = oneshot::channel();
        self.send(TableMsg::Info { reply });
        rx.await.ok()
    }
}

pub struct Table {
    id: TableId,
    cfg: TableConfig,
    seats: SeatManager,
    room: Room,
    hand: Option<HandState>,
    phase: TablePhase,
    controller: ActionController,
    dealer: Option<SeatId>,
    hand_no: u64,
    storage: Arc<dyn Storage>,
    maintenance: Arc<AtomicBool>,
    manager_tx: mpsc::UnboundedSender<ManagerMsg>,
    seated: Arc<AtomicUsize>,
    rx: mpsc::UnboundedReceiver<TableMsg>,
    rng: StdRng,
}

impl Table {
    /// Spawn a table actor and return its handle.
    pub fn spawn(
        cfg: TableConfig,
        storage: Arc<dyn Storage>,
        maintenance: Arc<AtomicBool>,
        manager_tx: mpsc::UnboundedSender<ManagerMsg>,
        invite_code: Option<String>,
    ) -> TableHandle {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let seated = Arc::new(AtomicUsize::new(0));
        let handle = TableHandle {
            id: id.clone(),
            stakes: cfg.stakes,
            is_fast_fold: cfg.is_fast_fold,
            is_private: cfg.is_private,
            invite_code,
            tx: tx.clone(),
            seated: Arc::clone(&seated),
        };
        let table = Table {
            id: id.clone(),
            cfg,
            seats: SeatManager::new(),
            room: Room::new(),
            hand: None,
            phase: TablePhase::Idle,
            controller: ActionController::new(tx),
            dealer: None,
            hand_no: 0,
            storage,
            maintenance,
            manager_tx,
            seated,
            rx,
            rng: StdRng::from_entropy(),
        };
        tokio::spawn(table.run());
        tracing::info!(target: LOG_TARGET, table_id = %id, "table spawned");
        handle
    }

    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            if matches!(msg, TableMsg::Shutdown) {
                break;
            }
            self.handle(msg);
        }
        self.controller.cancel_all();
        tracing::info!(target: LOG_TARGET, table_id = %self.id, "table stopped");
    }

    fn handle(&mut self, msg: TableMsg) {
        match msg {
            TableMsg::SeatPlayer {
                user_id,
                name,
                avatar,
                is_bot,
                session,
                chips,
                preferred,
                reply,
            } => {
                let result =
                    self.seat_player(user_id, name, avatar, is_bot, session, chips, preferred);
                let _ = reply.send(result);
            }
            TableMsg::Leave { user_id } => self.leave(&user_id),
            TableMsg::ClientAction {
                user_id,
                action,
                amount,
            } => self.client_action(&user_id, action, amount),
            TableMsg::FastFold { user_id } => self.fast_fold(&user_id),
            TableMsg::Spectate { session } => self.spectate(session),
            TableMsg::SessionDisconnected { user_id } => self.session_disconnected(&user_id),
            TableMsg::SessionRebound { user_id, session } => {
                self.session_rebound(&user_id, session)
            }
            TableMsg::TimerFired { key, generation } => self.timer_fired(key, generation),
            TableMsg::MaybeStartHand => self.maybe_start_hand(),
            TableMsg::Info { reply } => {
                let _ = reply.send(self.info());
            }
            TableMsg::Shutdown => unreachable!("handled in run()"),
        }
    }

    // -- seating ----------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn seat_player(
        &mut self,
        user_id: UserId,
        name: String,
        avatar: Option<String>,
        is_bot: bool,
        session: Option<Arc<SessionHandle>>,
        chips: Chips,
        preferred: Option<SeatId>,
    ) -> Result<SeatId, SeatError> {
        if self.maintenance.load(Ordering::Relaxed) {
            return Err(SeatError::Maintenance);
        }
        let hand_in_progress = self.hand.is_some();
        let seat = self.seats.seat_player(
            user_id,
            name,
            avatar,
            is_bot,
            session.clone(),
            chips,
            preferred,
            hand_in_progress,
        )?;
        self.seated
            .store(self.seats.seated_count(), Ordering::Relaxed);
        if let Some(session) = session {
            self.room.join(Arc::clone(&session));
            self.room.emit_to(
                &session,
                "table:joined",
                TableJoinedPayload {
                    table_id: &self.id,
                    seat,
                },
            );
        }
        self.broadcast_state();
        self.maybe_start_hand();
        Ok(seat)
    }

    fn leave(&mut self, user_id: &str) {
        let Some(seat) = self.seats.seat_of(user_id) else {
            return;
        };
        if self.seat_is_live_in_hand(seat) {
            // Fold now if it is their turn; the slot is cashed out once the
            // hand releases it.
            if let Some(slot) = self.seats.get_mut(seat) {
                slot.pending_unseat = true;
            }
            if self.hand.as_ref().and_then(|h| h.to_act) == Some(seat) {
                self.inject_fold(seat);
            }
        } else {
            self.remove_seat_now(seat, "table:left");
        }
    }

    fn session_disconnected(&mut self, user_id: &str) {
        let Some(seat) = self.seats.seat_of(user_id) else {
            return;
        };
        if let Some(slot) = self.seats.get_mut(seat) {
            if let Some(session) = slot.session.take() {
                self.room.leave(session.id);
            }
        }
        tracing::info!(
            target: LOG_TARGET,
            table_id = %self.id,
            user_id,
            seat,
            "seat disconnected"
        );
        self.leave(user_id);
    }

    /// A reconnecting user whose slot survived gets the new session bound to
    /// the old seat.
    fn session_rebound(&mut self, user_id: &str, session: Arc<SessionHandle>) {
        let Some(seat) = self.seats.seat_of(user_id) else {
            return;
        };
        if let Some(slot) = self.seats.get_mut(seat) {
            slot.session = Some(Arc::clone(&session));
            slot.pending_unseat = false;
        }
        self.room.join(Arc::clone(&session));
        self.room.emit_to(
            &session,
            "table:joined",
            TableJoinedPayload {
                table_id: &self.id,
                seat,
            },
        );
        self.broadcast_state();
        if let Some(hand) = &self.hand {
            if let Some(player) = hand.player(seat) {
                if !player.hole_cards.is_empty() {
                    self.room.emit_to(
                        &session,
                        "game:hole_cards",
                        HoleCardsPayload {
                            cards: player.hole_cards.clone(),
                        },
                    );
                }
            }
        }
    }

    fn remove_seat_now(&mut self, seat: SeatId, event: &str) {
        let Some((user_id, chips)) = self.seats.unseat_player(seat) else {
            return;
        };
        self.seated
            .store(self.seats.seated_count(), Ordering::Relaxed);
        let _ = self.manager_tx.send(ManagerMsg::PlayerLeftTable {
            user_id: user_id.clone(),
            table_id: self.id.clone(),
        });
        if chips > 0 {
            let storage = Arc::clone(&self.storage);
            let table_id = self.id.clone();
            let user = user_id.clone();
            tokio::spawn(async move {
                if let Err(err) = storage.cash_out(&user, chips, Some(&table_id)).await {
                    tracing::error!(
                        target: LOG_TARGET,
                        table_id,
                        user_id = %user,
                        %err,
                        "cash-out failed"
                    );
                }
            });
        }
        let session = self
            .room
            .members()
            .find(|m| m.user_id == user_id)
            .cloned();
        if let Some(session) = session {
            self.room.leave(session.id);
            session.send_empty(event);
        }
        self.broadcast_state();
        if self.seats.seated_count() == 0 && self.cfg.is_private {
            let _ = self.manager_tx.send(ManagerMsg::TableEmpty {
                table_id: self.id.clone(),
            });
        }
    }

    /// Whether this seat still has cards in the live hand.
    fn seat_is_live_in_hand(&self, seat: SeatId) -> bool {
        self.hand
            .as_ref()
            .filter(|h| !h.is_complete)
            .and_then(|h| h.player(seat))
            .map(|p| p.is_in_hand())
            .unwrap_or(false)
    }

    // -- spectators -------------------------------------------------------

    fn spectate(&mut self, session: Arc<SessionHandle>) {
        self.room.join(Arc::clone(&session));
        self.room.emit_to(
            &session,
            "table:spectating",
            serde_json::json!({ "tableId": self.id }),
        );
        let view = self.state_view(None);
        session.send("game:state", view);
        if let Some(cards) = self.all_hole_cards() {
            session.send("game:all_hole_cards", cards);
        }
    }

    // -- the action loop --------------------------------------------------

    fn client_action(&mut self, user_id: &str, action: ActionKind, amount: Option<Chips>) {
        let Some(seat) = self.seats.seat_of(user_id) else {
            return;
        };
        let Some(hand) = &self.hand else {
            return;
        };
        if hand.to_act != Some(seat) {
            // Wrong-turn input is dropped silently.
            return;
        }
        let Some(action) = PlayerAction::from_wire(action, amount) else {
            self.error_to(user_id, "Invalid action");
            return;
        };
        self.controller.cancel(TimerKey::Action);
        let outcome = process_command(
            hand,
            &Command::PlayerAction { seat, action },
            &self.cfg.rake,
        );
        if outcome.events.is_empty() {
            self.error_to(user_id, "Invalid action");
            // The decision clock restarts; the state did not move.
            self.request_next_action();
            return;
        }
        self.hand = Some(outcome.state);
        self.handle_events(outcome.events);
        if self.cfg.is_fast_fold && matches!(action, PlayerAction::Fold) {
            self.reassign_seat(seat);
        }
    }

    fn fast_fold(&mut self, user_id: &str) {
        if !self.cfg.is_fast_fold {
            self.error_to(user_id, "Not a fast-fold table");
            return;
        }
        let Some(seat) = self.seats.seat_of(user_id) else {
            return;
        };
        if self.seat_is_live_in_hand(seat) {
            if self.hand.as_ref().and_then(|h| h.to_act) == Some(seat) {
                self.client_action(user_id, ActionKind::Fold, None);
                return;
            }
            // Early fold: binding immediately, even before the seat's turn.
            let Some(hand) = &self.hand else { return };
            let outcome = process_early_fold(hand, seat, &self.cfg.rake);
            if !outcome.events.is_empty() {
                self.hand = Some(outcome.state);
                self.reassign_seat(seat);
                self.handle_events_without_pacing(outcome.events);
                return;
            }
        }
        self.reassign_seat(seat);
    }

    /// Vacate a fast-fold seat and hand the player back to the manager for
    /// re-seating at another table of the same blinds.
    fn reassign_seat(&mut self, seat: SeatId) {
        let Some(slot) = self.seats.get(seat) else {
            return;
        };
        if slot.left_for_fast_fold {
            return;
        }
        // The hand's stack snapshot is the live balance once a hand exists;
        // the slot only holds the between-hands value.
        let chips = self
            .hand
            .as_ref()
            .and_then(|h| h.player(seat))
            .map(|p| p.stack)
            .unwrap_or(slot.chips);
        let request = ManagerMsg::Reassign {
            user_id: slot.user_id.clone(),
            name: slot.name.clone(),
            avatar: slot.avatar.clone(),
            is_bot: slot.is_bot,
            session: slot.session.clone(),
            chips,
            blinds: self.cfg.stakes.label(),
            exclude_table: self.id.clone(),
        };
        if let Some(session) = &slot.session {
            self.room.leave(session.id);
        }
        if self.seat_is_live_in_hand(seat) {
            self.seats.mark_left_for_fast_fold(seat);
        } else {
            self.seats.unseat_player(seat);
            self.seated
                .store(self.seats.seated_count(), Ordering::Relaxed);
        }
        let _ = self.manager_tx.send(request);
        self.broadcast_state();
    }

    fn inject_fold(&mut self, seat: SeatId) {
        let Some(hand) = &self.hand else { return };
        self.controller.cancel(TimerKey::Action);
        let outcome = process_command(
            hand,
            &Command::PlayerAction {
                seat,
                action: PlayerAction::Fold,
            },
            &self.cfg.rake,
        );
        if !outcome.events.is_empty() {
            self.hand = Some(outcome.state);
            self.handle_events(outcome.events);
        }
    }

    fn timer_fired(&mut self, key: TimerKey, generation: u64) {
        if !self.controller.accept(key, generation) {
            return;
        }
        match key {
            TimerKey::Action => self.action_timed_out(),
            TimerKey::Animation => self.request_next_action(),
            TimerKey::StreetTransition => {
                self.phase = TablePhase::AwaitingAction;
                self.broadcast_state();
                self.request_next_action();
            }
            TimerKey::RunOut => self.publish_results(),
            TimerKey::NextHand => match self.phase {
                TablePhase::PostingResults => {
                    self.finalize_hand();
                    self.controller
                        .schedule(TimerKey::NextHand, self.cfg.post_hand_ms);
                }
                TablePhase::Idle => self.maybe_start_hand(),
                _ => {}
            },
        }
    }

    fn action_timed_out(&mut self) {
        let Some(hand) = &self.hand else { return };
        let Some(seat) = hand.to_act else { return };
        tracing::info!(
            target: LOG_TARGET,
            table_id = %self.id,
            seat,
            "action timeout"
        );
        let outcome = process_command(hand, &Command::Timeout { seat }, &self.cfg.rake);
        if !outcome.events.is_empty() {
            self.hand = Some(outcome.state);
            self.handle_events(outcome.events);
        }
    }

    /// Hand start: idempotent, gated on idle phase, maintenance, and two
    /// funded non-waiting seats.
    fn maybe_start_hand(&mut self) {
        if self.phase != TablePhase::Idle
            || self.hand.is_some()
            || self.maintenance.load(Ordering::Relaxed)
        {
            return;
        }
        self.seats.clear_waiting_flags();
        let playable = self.seats.playable_seats();
        if playable.len() < 2 {
            return;
        }
        let Some(button) = next_button(&playable, self.dealer) else {
            return;
        };
        self.dealer = Some(button);
        self.hand_no += 1;
        self.phase = TablePhase::Dealing;

        let players: Vec<HandPlayer> = playable
            .iter()
            .map(|&seat| {
                let slot = self.seats.get(seat).expect("playable seat occupied");
                HandPlayer::new(
                    seat,
                    slot.user_id.clone(),
                    slot.name.clone(),
                    slot.is_bot,
                    slot.chips,
                )
            })
            .collect();
        let state = HandState::new(
            self.hand_no,
            players,
            self.cfg.stakes,
            button,
            Deck::shuffled(&mut self.rng),
        );
        let outcome = process_command(&state, &Command::StartHand, &self.cfg.rake);
        if outcome.events.is_empty() {
            tracing::error!(target: LOG_TARGET, table_id = %self.id, "hand failed to start");
            self.phase = TablePhase::Idle;
            return;
        }
        tracing::info!(
            target: LOG_TARGET,
            table_id = %self.id,
            hand_no = self.hand_no,
            button,
            players = playable.len(),
            "hand started"
        );
        self.hand = Some(outcome.state);
        self.handle_events(outcome.events);
    }

    /// Drive the table machine from one command's event list.
    fn handle_events(&mut self, events: Vec<HandEvent>) {
        let street_changed = events.iter().any(|e| {
            matches!(
                e,
                HandEvent::StreetAdvanced { .. } | HandEvent::AllInRunout { .. }
            )
        });
        let mut completed = false;
        let mut ran_out = false;
        let mut advanced = false;

        for event in &events {
            match event {
                HandEvent::HandStarted { .. } => self.announce_deal(),
                HandEvent::ActionApplied {
                    seat,
                    action,
                    amount,
                } => {
                    let player_id = self
                        .hand
                        .as_ref()
                        .and_then(|h| h.player(*seat))
                        .map(|p| p.user_id.clone())
                        .unwrap_or_default();
                    self.room.emit(
                        "game:action_taken",
                        ActionTakenPayload {
                            player_id: &player_id,
                            action: *action,
                            amount: *amount,
                            street_changed,
                        },
                    );
                }
                HandEvent::StreetAdvanced { .. } => advanced = true,
                HandEvent::AllInRunout { .. } => ran_out = true,
                HandEvent::ShowdownReached => {}
                HandEvent::HandCompleted { .. } => completed = true,
            }
        }

        if completed {
            self.phase = TablePhase::PostingResults;
            if ran_out {
                // Let clients watch the board run out before the result.
                self.controller
                    .schedule(TimerKey::RunOut, self.cfg.street_transition_ms);
            } else {
                self.publish_results();
            }
        } else if advanced {
            self.phase = TablePhase::StreetTransition;
            self.controller
                .schedule(TimerKey::StreetTransition, self.cfg.street_transition_ms);
        } else {
            self.controller
                .schedule(TimerKey::Animation, self.cfg.action_animation_ms);
        }
    }

    /// Event handling for out-of-turn folds: the seat on turn keeps its
    /// running clock, so nothing is rescheduled unless the hand ended.
    fn handle_events_without_pacing(&mut self, events: Vec<HandEvent>) {
        let mut completed = false;
        for event in &events {
            match event {
                HandEvent::ActionApplied {
                    seat,
                    action,
                    amount,
                } => {
                    let player_id = self
                        .hand
                        .as_ref()
                        .and_then(|h| h.player(*seat))
                        .map(|p| p.user_id.clone())
                        .unwrap_or_default();
                    self.room.emit(
                        "game:action_taken",
                        ActionTakenPayload {
                            player_id: &player_id,
                            action: *action,
                            amount: *amount,
                            street_changed: false,
                        },
                    );
                }
                HandEvent::HandCompleted { .. } => completed = true,
                _ => {}
            }
        }
        if completed {
            self.controller.cancel(TimerKey::Action);
            self.phase = TablePhase::PostingResults;
            self.publish_results();
        }
    }

    /// Deal announcements: private hole cards per seat, the table snapshot to
    /// the room, all cards to spectators.
    fn announce_deal(&mut self) {
        self.broadcast_state();
        let Some(hand) = &self.hand else { return };
        let deals: Vec<(SeatId, Vec<crate::cards::Card>)> = hand
            .players
            .iter()
            .filter(|p| !p.hole_cards.is_empty())
            .map(|p| (p.seat, p.hole_cards.clone()))
            .collect();
        for (seat, cards) in deals {
            if let Some(session) = self.seats.get(seat).and_then(|s| s.session.clone()) {
                self.room
                    .emit_to(&session, "game:hole_cards", HoleCardsPayload { cards });
            }
        }
        if let Some(all) = self.all_hole_cards() {
            let spectators: Vec<Arc<SessionHandle>> = self
                .room
                .members()
                .filter(|m| self.seats.seat_of(&m.user_id).is_none())
                .cloned()
                .collect();
            for spectator in spectators {
                self.room
                    .emit_to(&spectator, "game:all_hole_cards", all.clone());
            }
        }
    }

    fn request_next_action(&mut self) {
        let Some(hand) = &self.hand else { return };
        if hand.is_complete {
            return;
        }
        let Some(seat) = hand.to_act else { return };
        self.phase = TablePhase::AwaitingAction;

        let valid = valid_actions(hand, seat);
        let player_id = hand
            .player(seat)
            .map(|p| p.user_id.clone())
            .unwrap_or_default();

        let absent = self
            .seats
            .get(seat)
            .map(|s| !s.is_connected() || s.pending_unseat || s.left_for_fast_fold)
            .unwrap_or(true);
        if absent {
            // Disconnect-fold: server-originated, broadcast like any action.
            self.inject_fold(seat);
            return;
        }

        self.broadcast_state();
        if let Some(session) = self.seats.get(seat).and_then(|s| s.session.clone()) {
            self.room.emit_to(
                &session,
                "game:action_required",
                ActionRequiredPayload {
                    player_id: &player_id,
                    valid_actions: &valid,
                    timeout_ms: self.cfg.action_timeout_ms,
                },
            );
        }
        self.controller
            .schedule_action(seat, self.cfg.action_timeout_ms);
    }

    // -- results ----------------------------------------------------------

    fn publish_results(&mut self) {
        let Some(hand) = self.hand.clone() else {
            return;
        };
        self.phase = TablePhase::PostingResults;
        self.broadcast_state();
        if let Some(all) = self.all_hole_cards() {
            self.room.emit("game:all_hole_cards", all);
        }
        self.room.emit(
            "game:hand_complete",
            HandCompletePayload {
                winners: hand.winners.clone(),
                rake: hand.rake,
                pot: hand.pot_size(),
                community_cards: hand.community.clone(),
            },
        );
        self.dispatch_persistence(&hand);
        self.controller
            .schedule(TimerKey::NextHand, self.cfg.result_display_ms);
    }

    /// Fire-and-forget history + stats writes. A failure here never blocks
    /// the next hand.
    fn dispatch_persistence(&self, hand: &HandState) {
        let profits: std::collections::HashMap<SeatId, i64> = hand
            .players
            .iter()
            .map(|p| {
                let won: i64 = hand
                    .winners
                    .iter()
                    .filter(|w| w.seat == p.seat)
                    .map(|w| w.amount as i64)
                    .sum();
                (p.seat, won - p.total_committed() as i64)
            })
            .collect();

        // All-in EV only applies when the board ran out for an all-in.
        let ev_profits = if hand.community.len() == 5
            && hand.seats_in_hand().len() > 1
            && hand
                .players
                .iter()
                .any(|p| p.status == PlayerStatus::AllIn)
        {
            let all_seats: Vec<(SeatId, [crate::cards::Card; 4], bool)> = hand
                .players
                .iter()
                .filter_map(|p| {
                    let hole: [crate::cards::Card; 4] = p.hole_cards.as_slice().try_into().ok()?;
                    Some((p.seat, hole, p.status == PlayerStatus::Folded))
                })
                .collect();
            let total_bets = hand
                .players
                .iter()
                .map(|p| (p.seat, p.total_committed()))
                .collect();
            let pots: Vec<_> = hand.pots.iter().cloned().collect();
            // Equity is taken from the street the last voluntary chips went
            // in, not from the runout's final board.
            let locked = hand
                .action_log
                .iter()
                .rev()
                .find(|e| e.action.is_voluntary())
                .map(|e| e.street)
                .unwrap_or(Street::Preflop);
            let known = locked.community_len().min(hand.community.len());
            let mut rng = StdRng::from_entropy();
            Some(calculate_all_in_ev_profits(
                &hand.community[..known],
                &all_seats,
                &pots,
                &total_bets,
                &mut rng,
            ))
        } else {
            None
        };

        let increments = compute_increments(hand, &profits, ev_profits.as_ref());

        let record = HandRecord {
            table_id: self.id.clone(),
            hand_no: hand.hand_no,
            blinds: self.cfg.stakes.label(),
            community: hand.community.clone(),
            pot: hand.pot_size(),
            rake: hand.rake,
            dealer_seat: hand.button,
            winners: hand.winners.clone(),
            actions: hand.action_log.clone(),
            players: hand
                .players
                .iter()
                .map(|p| HandPlayerRecord {
                    user_id: p.user_id.clone(),
                    seat: p.seat,
                    hole_cards: p.hole_cards.clone(),
                    final_hand: self.final_hand_label(hand, p.seat),
                    profit: profits.get(&p.seat).copied().unwrap_or(0),
                    all_in_ev_profit: ev_profits
                        .as_ref()
                        .and_then(|m| m.get(&p.seat).copied()),
                })
                .collect(),
            completed_at: chrono::Utc::now(),
        };

        let storage = Arc::clone(&self.storage);
        let table_id = self.id.clone();
        tokio::spawn(async move {
            if let Err(err) = storage.record_hand(record).await {
                tracing::error!(target: LOG_TARGET, table_id, %err, "hand record dropped");
            }
            if let Err(err) = storage.increment_stats(increments).await {
                tracing::error!(target: LOG_TARGET, table_id, %err, "stats increment dropped");
            }
        });
    }

    fn final_hand_label(&self, hand: &HandState, seat: SeatId) -> Option<String> {
        if hand.community.len() != 5 {
            return None;
        }
        let p = hand.player(seat)?;
        if !p.is_in_hand() {
            return None;
        }
        let hole: [crate::cards::Card; 4] = p.hole_cards.as_slice().try_into().ok()?;
        let board: [crate::cards::Card; 5] = hand.community.as_slice().try_into().ok()?;
        Some(evaluate_plo(&hole, &board).category.label().to_string())
    }

    /// Reconcile chips back into the seats, clear busted and departed slots,
    /// and return to idle.
    fn finalize_hand(&mut self) {
        let Some(hand) = self.hand.take() else {
            self.phase = TablePhase::Idle;
            return;
        };
        for p in &hand.players {
            if let Some(slot) = self.seats.get_mut(p.seat) {
                if slot.user_id == p.user_id && !slot.left_for_fast_fold {
                    slot.chips = p.stack;
                }
            }
        }

        let mut to_remove: Vec<(SeatId, &'static str)> = Vec::new();
        for (seat, slot) in self.seats.iter() {
            if slot.left_for_fast_fold {
                to_remove.push((seat, "")); // chips already carried
            } else if slot.pending_unseat {
                to_remove.push((seat, "table:left"));
            } else if slot.chips == 0 {
                to_remove.push((seat, "table:busted"));
            }
        }
        for (seat, event) in to_remove {
            if event.is_empty() {
                // Fast-fold leaver: chips were carried to the new table.
                self.seats.unseat_player(seat);
                self.seated
                    .store(self.seats.seated_count(), Ordering::Relaxed);
                continue;
            }
            if event == "table:busted" {
                if let Some(session) = self.seats.get(seat).and_then(|s| s.session.clone()) {
                    session.send(
                        "table:busted",
                        ErrorPayload {
                            message: "You are out of chips",
                        },
                    );
                }
            }
            self.remove_seat_now(seat, "table:left");
        }

        self.controller.cancel_all();
        self.phase = TablePhase::Idle;
        self.broadcast_state();
        if self.seats.seated_count() == 0 && self.cfg.is_private {
            let _ = self.manager_tx.send(ManagerMsg::TableEmpty {
                table_id: self.id.clone(),
            });
        }
    }

    // -- snapshots --------------------------------------------------------

    fn error_to(&mut self, user_id: &str, message: &str) {
        if let Some(session) = self
            .seats
            .iter()
            .find(|(_, s)| s.user_id == user_id)
            .and_then(|(_, s)| s.session.clone())
        {
            self.room
                .emit_to(&session, "table:error", ErrorPayload { message });
        }
    }

    /// The full-reveal card list, available at showdown.
    fn all_hole_cards(&self) -> Option<AllHoleCardsPayload> {
        let hand = self.hand.as_ref()?;
        let players: Vec<SeatHoleCards> = hand
            .players
            .iter()
            .filter(|p| p.is_in_hand() && !p.hole_cards.is_empty())
            .map(|p| SeatHoleCards {
                seat_index: p.seat,
                cards: p.hole_cards.clone(),
            })
            .collect();
        (!players.is_empty()).then_some(AllHoleCardsPayload { players })
    }

    /// Per-recipient masked snapshot; `None` masks every seat (spectators).
    fn state_view(&self, for_user: Option<&str>) -> GameStateView {
        let hand = self.hand.as_ref();
        let showdown_reveal = hand
            .map(|h| h.is_complete && h.seats_in_hand().len() > 1)
            .unwrap_or(false);
        let seats = self
            .seats
            .iter()
            .map(|(seat, slot)| {
                let hand_player = hand.and_then(|h| h.player(seat));
                let reveal = showdown_reveal
                    && hand_player.map(|p| p.is_in_hand()).unwrap_or(false);
                let own = for_user == Some(slot.user_id.as_str());
                let hole_cards = hand_player
                    .filter(|p| !p.hole_cards.is_empty() && (own || reveal))
                    .map(|p| p.hole_cards.clone());
                SeatView {
                    seat_index: seat,
                    player_id: slot.user_id.clone(),
                    name: slot.name.clone(),
                    is_bot: slot.is_bot,
                    chips: hand_player.map(|p| p.stack).unwrap_or(slot.chips),
                    current_bet: hand_player
                        .map(|p| p.committed_this_street)
                        .unwrap_or(0),
                    folded: hand_player
                        .map(|p| p.status == PlayerStatus::Folded)
                        .unwrap_or(false),
                    all_in: hand_player
                        .map(|p| p.status == PlayerStatus::AllIn)
                        .unwrap_or(false),
                    connected: slot.is_connected(),
                    waiting_for_next_hand: slot.waiting_for_next_hand,
                    hole_cards,
                }
            })
            .collect();
        GameStateView {
            table_id: self.id.clone(),
            blinds: self.cfg.stakes.label(),
            is_fast_fold: self.cfg.is_fast_fold,
            hand_no: hand.map(|h| h.hand_no),
            street: hand.map(|h| h.street),
            community_cards: hand.map(|h| h.community.clone()).unwrap_or_default(),
            pot: hand.map(|h| h.pot_size()).unwrap_or(0),
            current_bet: hand.map(|h| h.current_bet).unwrap_or(0),
            dealer_seat: self.dealer,
            current_player: hand.and_then(|h| h.to_act),
            seats,
        }
    }

    fn broadcast_state(&mut self) {
        let views: std::collections::HashMap<crate::session::SessionId, GameStateView> = self
            .room
            .members()
            .map(|m| {
                let seated = self.seats.seat_of(&m.user_id).is_some();
                (
                    m.id,
                    self.state_view(seated.then_some(m.user_id.as_str())),
                )
            })
            .collect();
        let fallback = self.state_view(None);
        self.room.emit_personalized("game:state", |member| {
            views.get(&member.id).cloned().unwrap_or_else(|| fallback.clone())
        });
    }

    fn info(&self) -> TableInfo {
        TableInfo {
            table_id: self.id.clone(),
            blinds: self.cfg.stakes.label(),
            is_fast_fold: self.cfg.is_fast_fold,
            is_private: self.cfg.is_private,
            phase: self.phase,
            seated: self.seats.seated_count(),
            hand_no: self.hand_no,
            recent_messages: self.room.recent_messages(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::protocol::WireMessage;
    use crate::storage::MemoryStore;

    fn test_config() -> TableConfig {
        TableConfig {
            stakes: TableStakes {
                small_blind: 1,
                big_blind: 3,
            },
            rake: RakeConfig::default(),
            is_fast_fold: false,
            is_private: false,
            action_timeout_ms: 1_000,
            action_animation_ms: 50,
            street_transition_ms: 100,
            result_display_ms: 200,
            post_hand_ms: 100,
        }
    }

    fn spawn_table(
        maintenance: bool,
    ) -> (TableHandle, mpsc::UnboundedReceiver<ManagerMsg>) {
        let storage = Arc::new(MemoryStore::new(10_000));
        let (manager_tx, manager_rx) = mpsc::unbounded_channel();
        let handle = Table::spawn(
            test_config(),
            storage,
            Arc::new(AtomicBool::new(maintenance)),
            manager_tx,
            None,
        );
        (handle, manager_rx)
    }

    async fn seat(
        handle: &TableHandle,
        user: &str,
    ) -> (
        Arc<SessionHandle>,
        mpsc::UnboundedReceiver<WireMessage>,
        Result<SeatId, SeatError>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = SessionHandle::new(user.to_string(), user.to_string(), None, false, tx);
        let (reply, reply_rx) = oneshot::channel();
        handle.send(TableMsg::SeatPlayer {
            user_id: user.to_string(),
            name: user.to_string(),
            avatar: None,
            is_bot: false,
            session: Some(Arc::clone(&session)),
            chips: 300,
            preferred: None,
            reply,
        });
        let result = reply_rx.await.unwrap();
        (session, rx, result)
    }

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<WireMessage>) -> WireMessage {
        tokio::time::timeout(Duration::from_secs(120), rx.recv())
            .await
            .expect("message within the test window")
            .expect("session channel open")
    }

    #[tokio::test(start_paused = true)]
    async fn two_seated_players_start_a_hand_and_timeouts_finish_it() {
        let (handle, _manager_rx) = spawn_table(false);
        let (_s1, mut rx1, seat1) = seat(&handle, "alice").await;
        let (_s2, _rx2, seat2) = seat(&handle, "bob").await;
        assert_eq!(seat1.unwrap(), 0);
        assert_eq!(seat2.unwrap(), 1);

        // With nobody answering prompts, the decision clock drives the hand:
        // check-else-fold until completion.
        let mut saw_hole_cards = false;
        let mut saw_action_prompt_or_taken = false;
        let mut completed = false;
        for _ in 0..400 {
            let msg = next_message(&mut rx1).await;
            match msg.event.as_str() {
                "game:hole_cards" => saw_hole_cards = true,
                "game:action_taken" | "game:action_required" => {
                    saw_action_prompt_or_taken = true
                }
                "game:hand_complete" => {
                    completed = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_hole_cards);
        assert!(saw_action_prompt_or_taken);
        assert!(completed);

        let info = handle.info().await.unwrap();
        assert_eq!(info.seated, 2);
        assert!(info.hand_no >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn maintenance_blocks_seating() {
        let (handle, _manager_rx) = spawn_table(true);
        let (_s1, _rx1, result) = seat(&handle, "alice").await;
        assert_eq!(result.unwrap_err(), SeatError::Maintenance);
        assert_eq!(handle.seated_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_between_hands_returns_chips_and_frees_the_seat() {
        let (handle, mut manager_rx) = spawn_table(false);
        let (_s1, mut rx1, _) = seat(&handle, "alice").await;
        // Alone at the table: no hand can start, leaving is immediate.
        handle.send(TableMsg::Leave {
            user_id: "alice".to_string(),
        });
        let mut left = false;
        for _ in 0..50 {
            let msg = next_message(&mut rx1).await;
            if msg.event == "table:left" {
                left = true;
                break;
            }
        }
        assert!(left);
        assert_eq!(handle.seated_count(), 0);
        let Some(ManagerMsg::PlayerLeftTable { user_id, .. }) = manager_rx.recv().await else {
            panic!("expected tracking removal");
        };
        assert_eq!(user_id, "alice");
    }
}
