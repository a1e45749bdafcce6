//! The pure hand engine: `start_hand`, `apply_action`, `determine_winner`.
//!
//! Every function takes the caller's state by reference and returns a fresh
//! state; the input is never mutated.

use std::collections::HashMap;

use super::actions::PlayerAction;
use super::errors::{ActionError, StateError};
use super::state::HandState;
use super::types::{
    Chips, LoggedAction, NormalizedAction, PlayerStatus, RakeConfig, SeatId, Street, Winner,
};
use crate::showdown::{evaluate_plo, HandRank};

/// Posts blinds, deals four hole cards per seat SB-first, and sets the first
/// decision. When the blinds leave no further action possible the board is
/// run out and the hand resolves inside this call.
pub fn start_hand(prev: &HandState, rake: &RakeConfig) -> Result<HandState, StateError> {
    if prev.started {
        return Err(StateError::InvalidTransition);
    }
    let mut state = prev.clone();

    let occupied: Vec<SeatId> = state
        .players
        .iter()
        .filter(|p| p.status == PlayerStatus::Active && p.stack > 0)
        .map(|p| p.seat)
        .collect();
    if occupied.len() < 2 {
        return Err(StateError::NotEnoughPlayers);
    }

    // Heads-up: the button posts the small blind.
    if occupied.len() == 2 {
        state.sb_seat = state.button;
        state.bb_seat = state
            .next_seat_where(state.button, |p| p.status == PlayerStatus::Active)
            .ok_or(StateError::NotEnoughPlayers)?;
    } else {
        state.sb_seat = state
            .next_seat_where(state.button, |p| p.status == PlayerStatus::Active)
            .ok_or(StateError::NotEnoughPlayers)?;
        state.bb_seat = state
            .next_seat_where(state.sb_seat, |p| p.status == PlayerStatus::Active)
            .ok_or(StateError::NotEnoughPlayers)?;
    }

    state.post_blinds();
    state.deal_hole_cards()?;
    state.started = true;
    state.street = Street::Preflop;
    state.refresh_pots();

    if no_further_action_possible(&state) {
        run_out_and_resolve(&mut state, rake)?;
    } else {
        state.to_act = state.first_to_act(Street::Preflop);
    }
    Ok(state)
}

/// Validates and applies one action, advancing streets and resolving the hand
/// where the action closes it. Returns the successor state.
pub fn apply_action(
    state: &HandState,
    seat: SeatId,
    action: PlayerAction,
    rake: &RakeConfig,
) -> Result<HandState, ActionError> {
    if !state.started {
        return Err(ActionError::HandNotStarted);
    }
    if state.is_complete {
        return Err(ActionError::HandComplete);
    }
    if state.to_act != Some(seat) {
        return Err(ActionError::NotPlayersTurn);
    }
    let player = state.player(seat).ok_or(ActionError::ActorCannotAct)?;
    if player.status != PlayerStatus::Active {
        return Err(ActionError::ActorCannotAct);
    }

    let mut next = state.clone();
    let normalized = apply_to(&mut next, seat, action)?;
    next.action_log.push(LoggedAction {
        street: next.street,
        seat,
        action: normalized,
    });
    next.refresh_pots();

    // Hand ends at once when a fold leaves a single contender.
    let remaining = next.seats_in_hand();
    if remaining.len() == 1 {
        settle_street(&mut next);
        determine_winner(&mut next, rake)?;
        return Ok(next);
    }

    if next.street_is_closed() {
        if next.street == Street::River {
            settle_street(&mut next);
            next.street = Street::Showdown;
            determine_winner(&mut next, rake)?;
        } else if no_further_action_possible(&next) {
            run_out_and_resolve(&mut next, rake)?;
        } else {
            let upcoming = next.street.next();
            next.reset_for_street(upcoming);
            next.reveal_community(upcoming)?;
            next.to_act = next.first_to_act(upcoming);
            next.refresh_pots();
        }
    } else {
        next.to_act = next.next_actor(seat);
    }
    Ok(next)
}

/// A binding fold from a seat that is not on turn (fast-fold early fold).
/// The seat leaves the hand immediately; turn order is untouched unless the
/// fold ends the hand.
pub fn fold_out_of_turn(
    state: &HandState,
    seat: SeatId,
    rake: &RakeConfig,
) -> Result<HandState, ActionError> {
    if state.to_act == Some(seat) {
        return apply_action(state, seat, PlayerAction::Fold, rake);
    }
    if !state.started {
        return Err(ActionError::HandNotStarted);
    }
    if state.is_complete {
        return Err(ActionError::HandComplete);
    }
    let mut next = state.clone();
    {
        let p = next.player_mut(seat).ok_or(ActionError::ActorCannotAct)?;
        if p.status != PlayerStatus::Active {
            return Err(ActionError::ActorCannotAct);
        }
        p.status = PlayerStatus::Folded;
        p.has_acted_this_street = true;
    }
    next.action_log.push(LoggedAction {
        street: next.street,
        seat,
        action: NormalizedAction::Fold,
    });
    next.refresh_pots();
    // The seat on turn still owes an action, so the street cannot close
    // here; only a hand-ending fold needs resolution.
    if next.seats_in_hand().len() == 1 {
        settle_street(&mut next);
        determine_winner(&mut next, rake)?;
    }
    Ok(next)
}

/// Whether applying this action would close the current street (or the hand).
/// Pure: evaluated against a scratch copy.
pub fn would_advance_street(state: &HandState, seat: SeatId, action: PlayerAction) -> bool {
    match apply_action(state, seat, action, &RakeConfig::NONE) {
        Ok(next) => next.street != state.street || next.is_complete,
        Err(_) => false,
    }
}

/// Resolves a finished hand: evaluates the remaining seats, pays each pot to
/// its best eligible hand, applies rake, and credits winners' stacks.
pub fn determine_winner(state: &mut HandState, rake_cfg: &RakeConfig) -> Result<(), StateError> {
    if state.is_complete {
        return Err(StateError::InvalidTransition);
    }
    let remaining = state.seats_in_hand();
    if remaining.is_empty() {
        return Err(StateError::NotEnoughPlayers);
    }
    let total_pot = state.pot_size();

    if remaining.len() == 1 {
        // Uncontested: no card evaluation, and a preflop walkover is unraked.
        let rake = if state.street == Street::Preflop {
            0
        } else {
            rake_cfg.rake_for(total_pot, state.stakes.big_blind)
        };
        let seat = remaining[0];
        let amount = total_pot - rake;
        if let Some(p) = state.player_mut(seat) {
            p.stack += amount;
        }
        state.winners = vec![Winner {
            seat,
            amount,
            category: None,
        }];
        state.rake = rake;
        state.is_complete = true;
        state.to_act = None;
        return Ok(());
    }

    if state.community.len() != 5 {
        return Err(StateError::InvalidTransition);
    }

    let ranks: HashMap<SeatId, HandRank> = remaining
        .iter()
        .map(|&seat| {
            let p = state.player(seat).expect("remaining seat exists");
            let hole: [crate::cards::Card; 4] = p
                .hole_cards
                .as_slice()
                .try_into()
                .map_err(|_| StateError::InvariantViolation("seat without four hole cards"))?;
            let board: [crate::cards::Card; 5] = state
                .community
                .as_slice()
                .try_into()
                .map_err(|_| StateError::InvariantViolation("incomplete board at showdown"))?;
            Ok((seat, evaluate_plo(&hole, &board)))
        })
        .collect::<Result<_, StateError>>()?;

    let rake = rake_cfg.rake_for(total_pot, state.stakes.big_blind);
    let position = state.seats_by_position();
    let mut won: HashMap<SeatId, Chips> = HashMap::new();

    let pots: Vec<_> = state.pots.iter().cloned().collect();
    let mut rake_left = rake;
    for pot in pots {
        let eligible: Vec<SeatId> = pot
            .eligible
            .iter()
            .copied()
            .filter(|s| remaining.contains(s))
            .collect();
        if eligible.is_empty() || pot.amount == 0 {
            continue;
        }
        // Rake comes off the first pots paid out.
        let taken = rake_left.min(pot.amount);
        rake_left -= taken;
        let amount = pot.amount - taken;

        let best = eligible
            .iter()
            .map(|s| ranks[s].score)
            .max()
            .expect("non-empty eligibility");
        let mut pot_winners: Vec<SeatId> = eligible
            .into_iter()
            .filter(|s| ranks[s].score == best)
            .collect();
        pot_winners.sort_by_key(|s| position.iter().position(|p| p == s));

        let n = pot_winners.len() as Chips;
        let share = amount / n;
        let remainder = amount % n;
        for (i, seat) in pot_winners.iter().enumerate() {
            let extra = if i == 0 { remainder } else { 0 };
            *won.entry(*seat).or_default() += share + extra;
        }
    }

    let mut winners: Vec<Winner> = won
        .into_iter()
        .map(|(seat, amount)| Winner {
            seat,
            amount,
            category: Some(ranks[&seat].category),
        })
        .collect();
    winners.sort_by_key(|w| position.iter().position(|p| *p == w.seat));
    for w in &winners {
        if let Some(p) = state.player_mut(w.seat) {
            p.stack += w.amount;
        }
    }

    state.winners = winners;
    state.rake = rake;
    state.is_complete = true;
    state.to_act = None;
    Ok(())
}

/// True when betting can no longer change anything: fewer than two seats can
/// act, and any lone actor already has the bet matched.
fn no_further_action_possible(state: &HandState) -> bool {
    let active = state.active_seats();
    match active.len() {
        0 => true,
        1 => state.price_to_call(active[0]) == 0,
        _ => false,
    }
}

/// Folds the current street's bets into the totals without opening a new
/// betting round. Used on the resolving paths.
fn settle_street(state: &mut HandState) {
    for p in &mut state.players {
        p.committed_total += p.committed_this_street;
        p.committed_this_street = 0;
    }
    state.current_bet = 0;
    state.refresh_pots();
}

/// Deals the remaining community cards atomically and resolves at showdown.
fn run_out_and_resolve(state: &mut HandState, rake: &RakeConfig) -> Result<(), StateError> {
    settle_street(state);
    state.reveal_community(Street::River)?;
    state.street = Street::Showdown;
    state.to_act = None;
    state.refresh_pots();
    determine_winner(state, rake)
}

/// Chip movement for one normalized action. Street/hand transitions are the
/// caller's job.
fn apply_to(
    state: &mut HandState,
    seat: SeatId,
    action: PlayerAction,
) -> Result<NormalizedAction, ActionError> {
    let price = state.price_to_call(seat);
    let current_bet = state.current_bet;
    let bb = state.stakes.big_blind;
    let min_raise_to = state.min_raise_to();
    let max_bet_to = state.max_bet_to();
    let max_raise_to = state.max_raise_to(seat);
    let may_raise = state.may_raise(seat);

    let idx = state
        .players
        .iter()
        .position(|p| p.seat == seat)
        .ok_or(ActionError::ActorCannotAct)?;
    let all_in_to = state.players[idx].committed_this_street + state.players[idx].stack;

    let normalized = match action {
        PlayerAction::Fold => {
            state.players[idx].status = PlayerStatus::Folded;
            state.players[idx].has_acted_this_street = true;
            NormalizedAction::Fold
        }
        PlayerAction::Check => {
            if price > 0 {
                return Err(ActionError::CannotCheckFacingBet);
            }
            state.players[idx].has_acted_this_street = true;
            NormalizedAction::Check
        }
        PlayerAction::Call => {
            if price == 0 {
                return Err(ActionError::IllegalAction);
            }
            let amount = price.min(state.players[idx].stack);
            commit(state, idx, amount);
            state.players[idx].has_acted_this_street = true;
            NormalizedAction::Call {
                amount,
                all_in: state.players[idx].status == PlayerStatus::AllIn,
            }
        }
        PlayerAction::Bet { to } => {
            if current_bet != 0 {
                return Err(ActionError::CannotBetWhenOpened);
            }
            let cap = max_bet_to.min(all_in_to);
            if to > cap {
                return Err(ActionError::RaiseAbovePotLimit);
            }
            if to < bb.min(cap) {
                return Err(ActionError::IllegalAction);
            }
            open_bet(state, idx, to);
            NormalizedAction::Bet {
                to,
                all_in: state.players[idx].status == PlayerStatus::AllIn,
            }
        }
        PlayerAction::Raise { to } => {
            if current_bet == 0 {
                return Err(ActionError::IllegalAction);
            }
            if !may_raise {
                return Err(ActionError::RaiseNotReopened);
            }
            let cap = max_raise_to.min(all_in_to);
            if to > cap {
                if to > max_raise_to {
                    return Err(ActionError::RaiseAbovePotLimit);
                }
                return Err(ActionError::InsufficientChips);
            }
            if to <= current_bet {
                return Err(ActionError::IllegalAction);
            }
            // Below-minimum raises are only legal as a full-stack all-in.
            if to < min_raise_to && to != all_in_to {
                return Err(ActionError::RaiseBelowMinimum);
            }
            raise_to(state, idx, to)
        }
        PlayerAction::AllIn => {
            // Pot-limit: a shove is clamped to the pot cap; the overage stays
            // behind and the action may not end up all-in at all.
            if current_bet == 0 {
                let to = all_in_to.min(max_bet_to);
                if to == 0 {
                    return Err(ActionError::InsufficientChips);
                }
                open_bet(state, idx, to);
                NormalizedAction::Bet {
                    to,
                    all_in: state.players[idx].status == PlayerStatus::AllIn,
                }
            } else if all_in_to <= current_bet {
                // Short call for the whole stack.
                let amount = state.players[idx].stack;
                commit(state, idx, amount);
                state.players[idx].has_acted_this_street = true;
                NormalizedAction::Call {
                    amount,
                    all_in: true,
                }
            } else {
                if !may_raise {
                    return Err(ActionError::RaiseNotReopened);
                }
                let to = all_in_to.min(max_raise_to);
                raise_to(state, idx, to)
            }
        }
    };
    Ok(normalized)
}

/// Move `amount` chips from the stack into the current street.
fn commit(state: &mut HandState, idx: usize, amount: Chips) {
    let p = &mut state.players[idx];
    debug_assert!(amount <= p.stack);
    p.stack -= amount;
    p.committed_this_street += amount;
    if p.stack == 0 {
        p.status = PlayerStatus::AllIn;
    }
}

/// First voluntary wager of a street; always reopens action.
fn open_bet(state: &mut HandState, idx: usize, to: Chips) {
    let seat = state.players[idx].seat;
    let needed = to - state.players[idx].committed_this_street;
    commit(state, idx, needed);
    state.players[idx].has_acted_this_street = true;
    state.current_bet = to;
    state.last_full_raise = to.max(state.stakes.big_blind);
    state.last_aggressor = Some(seat);
    state.voluntary_bet_opened = true;
    reopen_action_except(state, seat);
}

/// Raise to a street total, tracking whether the increment was a full raise
/// (and therefore reopens action to seats that already acted).
fn raise_to(state: &mut HandState, idx: usize, to: Chips) -> NormalizedAction {
    let seat = state.players[idx].seat;
    let needed = to - state.players[idx].committed_this_street;
    commit(state, idx, needed);
    state.players[idx].has_acted_this_street = true;

    let raise_amount = to - state.current_bet;
    let full = state.is_full_raise(raise_amount);
    if full {
        state.last_full_raise = raise_amount;
        state.last_aggressor = Some(seat);
        reopen_action_except(state, seat);
    }
    state.current_bet = to;
    state.voluntary_bet_opened = true;
    NormalizedAction::Raise {
        to,
        full,
        all_in: state.players[idx].status == PlayerStatus::AllIn,
    }
}

fn reopen_action_except(state: &mut HandState, seat: SeatId) {
    for p in &mut state.players {
        if p.seat != seat && p.status == PlayerStatus::Active {
            p.has_acted_this_street = false;
        }
    }
}
