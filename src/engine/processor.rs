//! The command processor: the only supported way to turn commands into hand
//! events. `(state, command) -> (state, events)`; invalid input returns the
//! unchanged state and no events.

use super::actions::{Command, PlayerAction};
use super::engine::{apply_action, fold_out_of_turn, start_hand};
use super::events::HandEvent;
use super::legals::valid_actions;
use super::state::HandState;
use super::types::{ActionKind, RakeConfig, SeatId};

const LOG_TARGET: &str = "engine::processor";

#[derive(Clone, Debug)]
pub struct CommandOutcome {
    pub state: HandState,
    pub events: Vec<HandEvent>,
}

impl CommandOutcome {
    fn unchanged(state: &HandState) -> Self {
        Self {
            state: state.clone(),
            events: Vec::new(),
        }
    }

    pub fn hand_completed(&self) -> bool {
        self.state.is_complete
    }
}

pub fn process_command(state: &HandState, command: &Command, rake: &RakeConfig) -> CommandOutcome {
    match command {
        Command::StartHand => process_start(state, rake),
        Command::PlayerAction { seat, action } => process_action(state, *seat, *action, rake),
        Command::Timeout { seat } => process_timeout(state, *seat, rake),
    }
}

fn process_start(state: &HandState, rake: &RakeConfig) -> CommandOutcome {
    let next = match start_hand(state, rake) {
        Ok(next) => next,
        Err(err) => {
            tracing::debug!(target: LOG_TARGET, %err, "start rejected");
            return CommandOutcome::unchanged(state);
        }
    };

    let hole_cards = next
        .players
        .iter()
        .filter(|p| !p.hole_cards.is_empty())
        .map(|p| (p.seat, p.hole_cards.clone()))
        .collect();
    let mut events = vec![HandEvent::HandStarted {
        dealer_seat: next.button,
        hole_cards,
    }];
    push_structural_events(state, &next, &mut events);
    CommandOutcome {
        state: next,
        events,
    }
}

fn process_action(
    state: &HandState,
    seat: SeatId,
    action: PlayerAction,
    rake: &RakeConfig,
) -> CommandOutcome {
    if !action_is_listed(state, seat, action) {
        return CommandOutcome::unchanged(state);
    }
    let next = match apply_action(state, seat, action, rake) {
        Ok(next) => next,
        Err(err) => {
            tracing::debug!(target: LOG_TARGET, seat, %err, "action rejected");
            return CommandOutcome::unchanged(state);
        }
    };

    // The normalized entry the engine just logged carries the applied kind
    // and amount.
    let logged = next
        .action_log
        .last()
        .and_then(|entry| entry.action.kind().map(|kind| (kind, entry.action.amount())));
    let mut events = Vec::with_capacity(3);
    if let Some((kind, amount)) = logged {
        events.push(HandEvent::ActionApplied { seat, action: kind, amount });
    }
    push_structural_events(state, &next, &mut events);
    CommandOutcome {
        state: next,
        events,
    }
}

/// Server-originated binding fold for a seat regardless of turn (fast-fold
/// early fold). Emits the same event sequence as an on-turn fold.
pub fn process_early_fold(state: &HandState, seat: SeatId, rake: &RakeConfig) -> CommandOutcome {
    let next = match fold_out_of_turn(state, seat, rake) {
        Ok(next) => next,
        Err(err) => {
            tracing::debug!(target: LOG_TARGET, seat, %err, "early fold rejected");
            return CommandOutcome::unchanged(state);
        }
    };
    let mut events = vec![HandEvent::ActionApplied {
        seat,
        action: ActionKind::Fold,
        amount: 0,
    }];
    push_structural_events(state, &next, &mut events);
    CommandOutcome {
        state: next,
        events,
    }
}

/// A deadline expiry becomes a check when checking is legal, otherwise a fold.
fn process_timeout(state: &HandState, seat: SeatId, rake: &RakeConfig) -> CommandOutcome {
    if state.to_act != Some(seat) {
        return CommandOutcome::unchanged(state);
    }
    let can_check = valid_actions(state, seat)
        .iter()
        .any(|v| v.action == ActionKind::Check);
    let action = if can_check {
        PlayerAction::Check
    } else {
        PlayerAction::Fold
    };
    process_action(state, seat, action, rake)
}

/// Wrong-seat or off-menu actions are soft errors: the caller sees no events.
fn action_is_listed(state: &HandState, seat: SeatId, action: PlayerAction) -> bool {
    let listed = valid_actions(state, seat);
    let kind = match action {
        PlayerAction::Fold => ActionKind::Fold,
        PlayerAction::Check => ActionKind::Check,
        PlayerAction::Call => ActionKind::Call,
        PlayerAction::Bet { .. } => ActionKind::Bet,
        PlayerAction::Raise { .. } => ActionKind::Raise,
        PlayerAction::AllIn => ActionKind::AllIn,
    };
    let Some(valid) = listed.iter().find(|v| v.action == kind) else {
        return false;
    };
    match action {
        PlayerAction::Bet { to } | PlayerAction::Raise { to } => {
            // An all-in-short raise below the minimum is carried by its own
            // max bound, so the listed range is authoritative.
            to >= valid.min_amount && to <= valid.max_amount
        }
        _ => true,
    }
}

/// Structural transitions observed between two states: street reveal or
/// runout first, then showdown, then completion.
fn push_structural_events(prev: &HandState, next: &HandState, events: &mut Vec<HandEvent>) {
    let revealed = next.community.len() > prev.community.len();
    if next.is_complete && revealed {
        events.push(HandEvent::AllInRunout {
            community_cards: next.community.clone(),
        });
    } else if !next.is_complete && next.street > prev.street {
        let new_cards = next.community[prev.community.len()..].to_vec();
        events.push(HandEvent::StreetAdvanced {
            street: next.street,
            new_cards,
        });
    }

    if next.is_complete && next.seats_in_hand().len() > 1 {
        events.push(HandEvent::ShowdownReached);
    }
    if next.is_complete {
        events.push(HandEvent::HandCompleted {
            winners: next.winners.clone(),
            rake: next.rake,
        });
    }
}
