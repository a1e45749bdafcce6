use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::*;
use crate::cards::Card;
use crate::engine::types::Pot;

fn c(s: &str) -> Card {
    s.parse().unwrap()
}

fn hole(a: &str, b: &str, x: &str, y: &str) -> [Card; 4] {
    [c(a), c(b), c(x), c(y)]
}

fn board(cards: &[&str]) -> Vec<Card> {
    cards.iter().map(|s| c(s)).collect()
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5EED)
}

fn assert_sums_to_one(equities: &HashMap<u8, f64>) {
    let total: f64 = equities.values().sum();
    assert!((total - 1.0).abs() < 1e-9, "equities sum to {total}");
}

#[test]
fn complete_board_is_a_single_evaluation() {
    // Seat 0 holds the nut straight on a dry board; seat 1 has nothing.
    let hands = vec![
        (0u8, hole("Ah", "Kd", "2c", "3c")),
        (1u8, hole("9h", "9d", "4s", "5s")),
    ];
    let community = board(&["Qh", "Jd", "Ts", "7c", "2d"]);
    let eq = calculate_equities(&community, &hands, &[], &mut rng());
    assert_eq!(eq[&0], 1.0);
    assert_eq!(eq[&1], 0.0);
    assert_sums_to_one(&eq);
}

#[test]
fn complete_board_tie_splits_evenly() {
    // Both hold A-T for the same broadway straight.
    let hands = vec![
        (0u8, hole("Ah", "Tc", "2c", "2d")),
        (1u8, hole("Ad", "Td", "3c", "3d")),
    ];
    let community = board(&["Kh", "Qs", "Jd", "7c", "4d"]);
    let eq = calculate_equities(&community, &hands, &[], &mut rng());
    assert!((eq[&0] - 0.5).abs() < 1e-12);
    assert!((eq[&1] - 0.5).abs() < 1e-12);
}

#[test]
fn one_card_to_come_enumerates_rivers() {
    // Seat 1 is drawing dead: seat 0 already has a full house over them.
    let hands = vec![
        (0u8, hole("Ah", "Ad", "Kc", "Kd")),
        (1u8, hole("7h", "7d", "8c", "9c")),
    ];
    let community = board(&["As", "Ks", "7s", "2h"]);
    let eq = calculate_equities(&community, &hands, &[], &mut rng());
    // Seat 1's only outs are the case seven for quads.
    assert!(eq[&0] > 0.9);
    assert_sums_to_one(&eq);

    // Deterministic: enumeration does not consult the RNG.
    let again = calculate_equities(&community, &hands, &[], &mut StdRng::seed_from_u64(999));
    assert_eq!(eq[&0].to_bits(), again[&0].to_bits());
}

#[test]
fn two_cards_to_come_enumerates_all_runouts() {
    let hands = vec![
        (0u8, hole("Ah", "Ad", "Kc", "Qd")),
        (1u8, hole("Jh", "Th", "9h", "8d")),
    ];
    let community = board(&["2h", "7c", "2s"]);
    let eq = calculate_equities(&community, &hands, &[], &mut rng());
    assert_sums_to_one(&eq);
    assert!(eq[&0] > eq[&1]); // overpair ahead of the open-ender
    assert!(eq[&1] > 0.05); // but the draw is live
}

#[test]
fn preflop_equity_uses_fixed_sample_and_stays_normalized() {
    let hands = vec![
        (0u8, hole("Ah", "Ad", "Kh", "Kd")),
        (1u8, hole("9s", "8s", "7c", "6c")),
        (2u8, hole("2c", "2d", "3h", "4h")),
    ];
    let eq = calculate_equities(&[], &hands, &[], &mut rng());
    assert_sums_to_one(&eq);
    // Double-suited aces are a clear multiway favourite.
    assert!(eq[&0] > eq[&1] && eq[&0] > eq[&2]);
    // Same seed, same sample path.
    let again = calculate_equities(&[], &hands, &[], &mut rng());
    assert_eq!(eq[&0].to_bits(), again[&0].to_bits());
}

#[test]
fn dead_cards_shift_enumeration() {
    // Seat 1 needs a river heart for the flush; marking most hearts dead
    // removes those outs from the enumeration.
    let hands = vec![
        (0u8, hole("Ah", "Ad", "Kc", "Qd")),
        (1u8, hole("Jh", "Th", "9h", "8d")),
    ];
    let community = board(&["2h", "7h", "2s", "3d"]);
    let live = calculate_equities(&community, &hands, &[], &mut rng());
    let dead = [c("4h"), c("5h"), c("6h"), c("Kh"), c("Qh")];
    let drawless = calculate_equities(&community, &hands, &dead, &mut rng());
    assert!(drawless[&1] < live[&1]);
    assert_sums_to_one(&drawless);
}

#[test]
fn single_eligible_seat_takes_whole_pot() {
    let seats = vec![
        (0u8, hole("Ah", "Ad", "Kc", "Kd"), false),
        (1u8, hole("7h", "7d", "8c", "9c"), true), // folded
    ];
    let pots = vec![Pot {
        amount: 120,
        eligible: vec![0],
    }];
    let bets = HashMap::from([(0u8, 60u64), (1u8, 60u64)]);
    let profits = calculate_all_in_ev_profits(
        &board(&["As", "Ks", "7s", "2h", "2d"]),
        &seats,
        &pots,
        &bets,
        &mut rng(),
    );
    assert_eq!(profits[&0], 60); // 120 pot minus 60 contributed
    assert_eq!(profits[&1], -60);
}

#[test]
fn side_pots_pay_equity_to_their_own_eligibles() {
    // Seat 0 is all-in short; seats 1 and 2 contest a side pot seat 0 cannot
    // win. On a locked board seat 1 scoops everything it is eligible for.
    let seats = vec![
        (0u8, hole("2c", "2d", "3h", "4s"), false),
        (1u8, hole("Ah", "Kd", "Ac", "3c"), false),
        (2u8, hole("9h", "9d", "5s", "6s"), false),
    ];
    let pots = vec![
        Pot {
            amount: 90,
            eligible: vec![0, 1, 2],
        },
        Pot {
            amount: 140,
            eligible: vec![1, 2],
        },
    ];
    let bets = HashMap::from([(0u8, 30u64), (1u8, 100u64), (2u8, 100u64)]);
    let community = board(&["Qh", "Jd", "Ts", "7c", "2h"]);
    // Seat 1: broadway straight; seat 2: a pair; seat 0: trip deuces.
    let profits =
        calculate_all_in_ev_profits(&community, &seats, &pots, &bets, &mut rng());
    assert_eq!(profits[&1], 130); // wins both pots: 230 - 100
    assert_eq!(profits[&0], -30);
    assert_eq!(profits[&2], -100);
}

#[test]
fn ev_profits_round_half_to_even() {
    // A dead-even chop over a 25-chip pot gives 12.5 EV each: banker's
    // rounding sends both to 12.
    let seats = vec![
        (0u8, hole("Ah", "Tc", "2c", "2d"), false),
        (1u8, hole("Ad", "Td", "3c", "3d"), false),
    ];
    let pots = vec![Pot {
        amount: 25,
        eligible: vec![0, 1],
    }];
    let bets = HashMap::from([(0u8, 0u64), (1u8, 0u64)]);
    let community = board(&["Kh", "Qs", "Jd", "7c", "4d"]);
    let profits =
        calculate_all_in_ev_profits(&community, &seats, &pots, &bets, &mut rng());
    assert_eq!(profits[&0], 12);
    assert_eq!(profits[&1], 12);
}
