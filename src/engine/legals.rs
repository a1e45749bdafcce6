use serde::{Deserialize, Serialize};

use super::state::HandState;
use super::types::{ActionKind, Chips, PlayerStatus, SeatId};

/// One legal action with its chip bounds. Amounts for bet/raise are street
/// totals; for call the single callable amount; zero for fold/check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidAction {
    pub action: ActionKind,
    #[serde(rename = "minAmount")]
    pub min_amount: Chips,
    #[serde(rename = "maxAmount")]
    pub max_amount: Chips,
}

impl ValidAction {
    fn fixed(action: ActionKind, amount: Chips) -> Self {
        Self {
            action,
            min_amount: amount,
            max_amount: amount,
        }
    }
}

/// The actions legal for `seat` at the current decision point. Empty unless
/// the hand is live and it is this seat's turn.
pub fn valid_actions(state: &HandState, seat: SeatId) -> Vec<ValidAction> {
    if !state.started || state.is_complete || state.to_act != Some(seat) {
        return Vec::new();
    }
    let Some(player) = state.player(seat) else {
        return Vec::new();
    };
    if player.status != PlayerStatus::Active {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(4);
    let to_call = state.price_to_call(seat);
    let all_in_to = player.committed_this_street + player.stack;
    let more_than_one_left = state.seats_in_hand().len() > 1;

    if more_than_one_left {
        out.push(ValidAction::fixed(ActionKind::Fold, 0));
    }

    if to_call == 0 {
        out.push(ValidAction::fixed(ActionKind::Check, 0));
    } else {
        out.push(ValidAction::fixed(
            ActionKind::Call,
            to_call.min(player.stack),
        ));
    }

    if state.current_bet == 0 && player.stack > 0 {
        let max = state.max_bet_to().min(all_in_to);
        let min = state.stakes.big_blind.min(max);
        out.push(ValidAction {
            action: ActionKind::Bet,
            min_amount: min,
            max_amount: max,
        });
    }

    // Raising needs an open bet (the preflop big-blind option counts: the
    // blind is a live bet the BB has not yet acted on).
    let facing_open = state.current_bet > 0;
    let may_raise = facing_open && state.may_raise(seat);
    let max_raise_to = state.max_raise_to(seat).min(all_in_to);
    if may_raise && max_raise_to > state.current_bet {
        let min_to = state.min_raise_to().min(max_raise_to);
        out.push(ValidAction {
            action: ActionKind::Raise,
            min_amount: min_to,
            max_amount: max_raise_to,
        });
    }

    // All-in is always available to a funded seat, except where it would be a
    // raise that the short-all-in rule has closed off.
    let all_in_is_raise = facing_open && all_in_to > state.current_bet;
    if player.stack > 0 && (!all_in_is_raise || may_raise) {
        out.push(ValidAction::fixed(ActionKind::AllIn, all_in_to));
    }

    out
}
