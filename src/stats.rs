//! Per-player statistics increments derived from one completed hand.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::types::{
    LoggedAction, NormalizedAction, SeatId, Street, UserId,
};
use crate::engine::HandState;

/// Counters added to a player's cached statistics after each hand. All fields
/// are increments, applied with saturating adds by the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsIncrement {
    pub hands_played: u32,
    pub vpip: u32,
    pub pfr: u32,
    pub three_bet: u32,
    pub four_bet: u32,
    pub cbet_opportunities: u32,
    pub cbets: u32,
    pub fold_to_cbet_opportunities: u32,
    pub folds_to_cbet: u32,
    pub saw_flop: u32,
    pub went_to_showdown: u32,
    pub won_at_showdown: u32,
    /// Aggression frequency numerator (bets + raises) and denominator
    /// (bets + raises + calls + folds), postflop.
    pub aggressive_actions: u32,
    pub afq_actions: u32,
    pub profit: i64,
    pub all_in_ev_profit: Option<i64>,
}

/// Compute each seated player's increments from the finished hand.
/// `ev_profits` carries the all-in adjusted results where the hand was run
/// out; `profits` is realised chips won minus chips committed.
pub fn compute_increments(
    state: &HandState,
    profits: &HashMap<SeatId, i64>,
    ev_profits: Option<&HashMap<SeatId, i64>>,
) -> HashMap<UserId, StatsIncrement> {
    let mut out: HashMap<UserId, StatsIncrement> = HashMap::new();
    let preflop_raises = preflop_raise_seats(&state.action_log);
    let flop_cbettor = continuation_bettor(state, &preflop_raises);
    let showdown = state.is_complete && state.seats_in_hand().len() > 1;

    for p in &state.players {
        let seat = p.seat;
        let mut inc = StatsIncrement {
            hands_played: 1,
            ..Default::default()
        };

        let mut saw_flop = false;
        for entry in &state.action_log {
            if entry.seat != seat {
                continue;
            }
            match entry.street {
                Street::Preflop => match entry.action {
                    NormalizedAction::Call { .. }
                    | NormalizedAction::Bet { .. }
                    | NormalizedAction::Raise { .. } => {
                        inc.vpip = 1;
                    }
                    _ => {}
                },
                _ => saw_flop = true,
            }
            if entry.street != Street::Preflop {
                match entry.action {
                    NormalizedAction::Bet { .. } | NormalizedAction::Raise { .. } => {
                        inc.aggressive_actions += 1;
                        inc.afq_actions += 1;
                    }
                    NormalizedAction::Call { .. } | NormalizedAction::Fold => {
                        inc.afq_actions += 1;
                    }
                    _ => {}
                }
            }
        }
        // A seat that reached the flop without folding saw it even if it
        // never had to act there (all-in preflop).
        if !saw_flop && p.is_in_hand() && state.street > Street::Preflop {
            saw_flop = true;
        }
        inc.saw_flop = saw_flop as u32;

        if preflop_raises.contains(&seat) {
            inc.pfr = 1;
        }
        // 3-bet: the second preflop raise; 4-bet: the third.
        if preflop_raises.get(1) == Some(&seat) {
            inc.three_bet = 1;
        }
        if preflop_raises.get(2) == Some(&seat) {
            inc.four_bet = 1;
        }

        // Continuation bet accounting on the flop.
        if let Some(cbettor) = flop_cbettor {
            if cbettor == seat {
                inc.cbet_opportunities = 1;
                inc.cbets = 1;
            } else if faced_flop_cbet(state, seat, cbettor) {
                inc.fold_to_cbet_opportunities = 1;
                if folded_on_flop_after(state, seat, cbettor) {
                    inc.folds_to_cbet = 1;
                }
            }
        } else if preflop_raises.last() == Some(&seat) && had_flop_action(state, seat) {
            // Last aggressor who reached the flop but declined to fire.
            inc.cbet_opportunities = 1;
        }

        if showdown && p.is_in_hand() {
            inc.went_to_showdown = 1;
            if state.winners.iter().any(|w| w.seat == seat) {
                inc.won_at_showdown = 1;
            }
        }

        inc.profit = profits.get(&seat).copied().unwrap_or(0);
        inc.all_in_ev_profit = ev_profits.and_then(|m| m.get(&seat).copied());

        out.insert(p.user_id.clone(), inc);
    }
    out
}

/// Seats that raised preflop, in order (the first entry is the open raise).
fn preflop_raise_seats(log: &[LoggedAction]) -> Vec<SeatId> {
    log.iter()
        .filter(|e| e.street == Street::Preflop)
        .filter(|e| matches!(e.action, NormalizedAction::Raise { .. } | NormalizedAction::Bet { .. }))
        .map(|e| e.seat)
        .collect()
}

/// The last preflop aggressor, when they made the first flop bet.
fn continuation_bettor(state: &HandState, preflop_raises: &[SeatId]) -> Option<SeatId> {
    let aggressor = *preflop_raises.last()?;
    let first_flop_bet = state
        .action_log
        .iter()
        .find(|e| e.street == Street::Flop && matches!(e.action, NormalizedAction::Bet { .. }))?;
    (first_flop_bet.seat == aggressor).then_some(aggressor)
}

/// Whether `seat` took any flop action after the c-bettor's bet.
fn faced_flop_cbet(state: &HandState, seat: SeatId, cbettor: SeatId) -> bool {
    let mut seen_cbet = false;
    for e in state.action_log.iter().filter(|e| e.street == Street::Flop) {
        if e.seat == cbettor && matches!(e.action, NormalizedAction::Bet { .. }) {
            seen_cbet = true;
            continue;
        }
        if seen_cbet && e.seat == seat {
            return true;
        }
    }
    false
}

fn folded_on_flop_after(state: &HandState, seat: SeatId, cbettor: SeatId) -> bool {
    let mut seen_cbet = false;
    for e in state.action_log.iter().filter(|e| e.street == Street::Flop) {
        if e.seat == cbettor && matches!(e.action, NormalizedAction::Bet { .. }) {
            seen_cbet = true;
            continue;
        }
        if seen_cbet && e.seat == seat {
            return matches!(e.action, NormalizedAction::Fold);
        }
    }
    false
}

fn had_flop_action(state: &HandState, seat: SeatId) -> bool {
    state
        .action_log
        .iter()
        .any(|e| e.street == Street::Flop && e.seat == seat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Deck;
    use crate::engine::{
        apply_action, start_hand, HandPlayer, HandState, PlayerAction, RakeConfig, TableStakes,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn played_hand(script: &[(SeatId, PlayerAction)]) -> HandState {
        let players = (0..3)
            .map(|s| {
                HandPlayer::new(s, format!("user-{s}"), format!("p{s}"), false, 300)
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(42);
        let st = HandState::new(
            1,
            players,
            TableStakes {
                small_blind: 1,
                big_blind: 3,
            },
            0,
            Deck::shuffled(&mut rng),
        );
        let mut st = start_hand(&st, &RakeConfig::NONE).unwrap();
        for (seat, action) in script {
            st = apply_action(&st, *seat, *action, &RakeConfig::NONE).unwrap();
        }
        st
    }

    fn realised_profits(st: &HandState) -> HashMap<SeatId, i64> {
        st.players
            .iter()
            .map(|p| {
                let won: i64 = st
                    .winners
                    .iter()
                    .filter(|w| w.seat == p.seat)
                    .map(|w| w.amount as i64)
                    .sum();
                (p.seat, won - p.total_committed() as i64)
            })
            .collect()
    }

    #[test]
    fn vpip_and_pfr_track_voluntary_preflop_money() {
        // Seat 0 raises, seat 1 folds, seat 2 calls.
        let st = played_hand(&[
            (0, PlayerAction::Raise { to: 9 }),
            (1, PlayerAction::Fold),
            (2, PlayerAction::Call),
        ]);
        let profits = realised_profits(&st);
        let inc = compute_increments(&st, &profits, None);
        assert_eq!(inc["user-0"].vpip, 1);
        assert_eq!(inc["user-0"].pfr, 1);
        assert_eq!(inc["user-1"].vpip, 0);
        assert_eq!(inc["user-1"].pfr, 0);
        assert_eq!(inc["user-2"].vpip, 1);
        assert_eq!(inc["user-2"].pfr, 0);
        assert!(inc.values().all(|i| i.hands_played == 1));
    }

    #[test]
    fn three_bet_is_the_second_preflop_raise() {
        let st = played_hand(&[
            (0, PlayerAction::Raise { to: 9 }),
            (1, PlayerAction::Raise { to: 27 }),
            (2, PlayerAction::Fold),
            (0, PlayerAction::Call),
        ]);
        let profits = realised_profits(&st);
        let inc = compute_increments(&st, &profits, None);
        assert_eq!(inc["user-1"].three_bet, 1);
        assert_eq!(inc["user-0"].three_bet, 0);
    }

    #[test]
    fn cbet_and_fold_to_cbet_on_the_flop() {
        // Seat 0 raises preflop and bets the flop; seat 2 calls pre, folds to
        // the c-bet.
        let st = played_hand(&[
            (0, PlayerAction::Raise { to: 9 }),
            (1, PlayerAction::Fold),
            (2, PlayerAction::Call),
            // flop: seat 2 first to act
            (2, PlayerAction::Check),
            (0, PlayerAction::Bet { to: 10 }),
            (2, PlayerAction::Fold),
        ]);
        let profits = realised_profits(&st);
        let inc = compute_increments(&st, &profits, None);
        assert_eq!(inc["user-0"].cbets, 1);
        assert_eq!(inc["user-0"].cbet_opportunities, 1);
        assert_eq!(inc["user-2"].fold_to_cbet_opportunities, 1);
        assert_eq!(inc["user-2"].folds_to_cbet, 1);
        assert!(st.is_complete);
        // Winner's profit is what the other seats committed: 9 + 1.
        assert_eq!(inc["user-0"].profit, 10);
    }

    #[test]
    fn showdown_counters_and_profit_conservation() {
        let st = played_hand(&[
            (0, PlayerAction::Call),
            (1, PlayerAction::Call),
            (2, PlayerAction::Check),
            (1, PlayerAction::Check),
            (2, PlayerAction::Check),
            (0, PlayerAction::Check),
            (1, PlayerAction::Check),
            (2, PlayerAction::Check),
            (0, PlayerAction::Check),
            (1, PlayerAction::Check),
            (2, PlayerAction::Check),
            (0, PlayerAction::Check),
        ]);
        assert!(st.is_complete);
        let profits = realised_profits(&st);
        let inc = compute_increments(&st, &profits, None);
        let total: i64 = inc.values().map(|i| i.profit).sum();
        assert_eq!(total, 0); // no rake: zero-sum
        for i in inc.values() {
            assert_eq!(i.went_to_showdown, 1);
            assert_eq!(i.saw_flop, 1);
        }
        let winners: u32 = inc.values().map(|i| i.won_at_showdown).sum();
        assert!(winners >= 1);
    }
}
