//! Multiway all-in equity and EV-profit calculation.
//!
//! With `k = 5 - |community|` cards to come: `k == 0` is a single
//! evaluation, `k <= 2` enumerates every remaining board, and `k >= 3` takes
//! a fixed 2000-board sample drawn uniformly without replacement.

use std::collections::HashMap;

use rand::Rng;

use crate::cards::{Card, Deck};
use crate::engine::types::{Chips, Pot, SeatId};
use crate::showdown::evaluate_plo;

const MONTE_CARLO_TRIALS: usize = 2000;

/// Equity per seat over the given hole cards; shares always sum to 1.
pub fn calculate_equities(
    community: &[Card],
    active_hands: &[(SeatId, [Card; 4])],
    dead_cards: &[Card],
    rng: &mut impl Rng,
) -> HashMap<SeatId, f64> {
    let mut shares: HashMap<SeatId, f64> = active_hands.iter().map(|(s, _)| (*s, 0.0)).collect();
    if active_hands.is_empty() {
        return shares;
    }
    let k = 5 - community.len();
    if k == 0 {
        let board: [Card; 5] = community.try_into().expect("full board");
        award_board(&board, active_hands, &mut shares);
        return shares;
    }

    let remaining = remaining_cards(community, active_hands, dead_cards);
    let mut trials = 0usize;
    let mut board: Vec<Card> = community.to_vec();

    if k <= 2 {
        // Exhaustive enumeration of the missing cards.
        if k == 1 {
            for &c in &remaining {
                board.truncate(community.len());
                board.push(c);
                let full: [Card; 5] = board.as_slice().try_into().expect("full board");
                award_board(&full, active_hands, &mut shares);
                trials += 1;
            }
        } else {
            for i in 0..remaining.len() {
                for j in (i + 1)..remaining.len() {
                    board.truncate(community.len());
                    board.push(remaining[i]);
                    board.push(remaining[j]);
                    let full: [Card; 5] = board.as_slice().try_into().expect("full board");
                    award_board(&full, active_hands, &mut shares);
                    trials += 1;
                }
            }
        }
    } else {
        // Uniform sample without replacement per trial: a partial
        // Fisher-Yates prefix of length k.
        let mut pool = remaining.clone();
        for _ in 0..MONTE_CARLO_TRIALS {
            for i in 0..k {
                let j = rng.gen_range(i..pool.len());
                pool.swap(i, j);
            }
            board.truncate(community.len());
            board.extend_from_slice(&pool[..k]);
            let full: [Card; 5] = board.as_slice().try_into().expect("full board");
            award_board(&full, active_hands, &mut shares);
            trials += 1;
        }
    }

    if trials > 0 {
        for v in shares.values_mut() {
            *v /= trials as f64;
        }
    }
    shares
}

/// Expected profit per seat had the all-in been run to completion: equity
/// against each side pot's eligible subset, minus what the seat put in.
/// Profits are rounded half-to-even to whole chips.
pub fn calculate_all_in_ev_profits(
    community: &[Card],
    all_seats: &[(SeatId, [Card; 4], bool)], // (seat, hole, folded)
    side_pots: &[Pot],
    total_bets: &HashMap<SeatId, Chips>,
    rng: &mut impl Rng,
) -> HashMap<SeatId, i64> {
    let folded_cards: Vec<Card> = all_seats
        .iter()
        .filter(|(_, _, folded)| *folded)
        .flat_map(|(_, hole, _)| hole.iter().copied())
        .collect();

    let mut ev: HashMap<SeatId, f64> = HashMap::new();
    for pot in side_pots {
        let eligible: Vec<(SeatId, [Card; 4])> = all_seats
            .iter()
            .filter(|(seat, _, folded)| !*folded && pot.eligible.contains(seat))
            .map(|(seat, hole, _)| (*seat, *hole))
            .collect();
        match eligible.len() {
            0 => continue,
            1 => {
                *ev.entry(eligible[0].0).or_default() += pot.amount as f64;
            }
            _ => {
                let equities = calculate_equities(community, &eligible, &folded_cards, rng);
                for (seat, eq) in equities {
                    *ev.entry(seat).or_default() += eq * pot.amount as f64;
                }
            }
        }
    }

    let mut profits: HashMap<SeatId, i64> = HashMap::new();
    for (seat, _, folded) in all_seats {
        let winnings = ev.get(seat).copied().unwrap_or(0.0);
        let bet = total_bets.get(seat).copied().unwrap_or(0) as i64;
        let profit = if *folded {
            -bet
        } else {
            winnings.round_ties_even() as i64 - bet
        };
        profits.insert(*seat, profit);
    }
    profits
}

/// Give each trial's winners `1/|winners|` of one board.
fn award_board(
    board: &[Card; 5],
    active_hands: &[(SeatId, [Card; 4])],
    shares: &mut HashMap<SeatId, f64>,
) {
    let mut best = 0u32;
    let mut winners: Vec<SeatId> = Vec::with_capacity(active_hands.len());
    for (seat, hole) in active_hands {
        let score = evaluate_plo(hole, board).score;
        if winners.is_empty() || score > best {
            best = score;
            winners.clear();
            winners.push(*seat);
        } else if score == best {
            winners.push(*seat);
        }
    }
    let share = 1.0 / winners.len() as f64;
    for seat in winners {
        *shares.entry(seat).or_default() += share;
    }
}

/// The deck minus community, hole, and dead cards.
fn remaining_cards(
    community: &[Card],
    active_hands: &[(SeatId, [Card; 4])],
    dead_cards: &[Card],
) -> Vec<Card> {
    let mut used: Vec<Card> = community.to_vec();
    for (_, hole) in active_hands {
        used.extend_from_slice(hole);
    }
    used.extend_from_slice(dead_cards);

    let mut deck = Deck::new();
    let mut out = Vec::with_capacity(52 - used.len());
    while let Some(card) = deck.draw() {
        if !used.contains(&card) {
            out.push(card);
        }
    }
    out
}

#[cfg(test)]
mod tests;
