use super::*;
use crate::cards::Card;

fn c(s: &str) -> Card {
    s.parse().unwrap()
}

fn five(s: [&str; 5]) -> [Card; 5] {
    [c(s[0]), c(s[1]), c(s[2]), c(s[3]), c(s[4])]
}

fn score(s: [&str; 5]) -> u32 {
    HandRank::of_five(five(s)).score
}

#[test]
fn ordering_intra_category() {
    // SF: Royal > 9-high > Wheel
    assert!(score(["As", "Ks", "Qs", "Js", "Ts"]) > score(["9h", "8h", "7h", "6h", "5h"]));
    assert!(score(["9h", "8h", "7h", "6h", "5h"]) > score(["5d", "4d", "3d", "2d", "Ad"]));

    // 4K: Aces+K > Aces+2 > Queens+Ace
    assert!(score(["Ac", "Ad", "Ah", "As", "Kc"]) > score(["Ac", "Ad", "Ah", "As", "2c"]));
    assert!(score(["Ac", "Ad", "Ah", "As", "2c"]) > score(["Qc", "Qd", "Qh", "Qs", "Ac"]));

    // FH: AAA-KK > KKK-AA > QQQ-99
    assert!(score(["Ac", "Ad", "Ah", "Kc", "Kd"]) > score(["Kc", "Kd", "Kh", "Ac", "Ad"]));
    assert!(score(["Kc", "Kd", "Kh", "Ac", "Ad"]) > score(["Qc", "Qd", "Qh", "9c", "9d"]));

    // Flush lex order
    assert!(score(["As", "Qs", "9s", "7s", "2s"]) > score(["Ah", "Qh", "9h", "6h", "5h"]));
    assert!(score(["Ah", "Qh", "9h", "6h", "5h"]) > score(["Kd", "9d", "8d", "4d", "3d"]));

    // Straight: A-high > 9-high > wheel
    assert!(score(["Ac", "Kd", "Qh", "Js", "Tc"]) > score(["9c", "8d", "7h", "6s", "5c"]));
    assert!(score(["9c", "8d", "7h", "6s", "5c"]) > score(["5c", "4d", "3h", "2s", "Ac"]));

    // Trips, two pair, one pair, high card kickers
    assert!(score(["Qs", "Qh", "Qd", "Ac", "Kc"]) > score(["9s", "9h", "9d", "Ac", "2c"]));
    assert!(score(["Ac", "Ad", "Kc", "Kd", "Qc"]) > score(["Ac", "Ad", "Kc", "Kd", "2c"]));
    assert!(score(["Ac", "Ad", "Kc", "Qc", "Jc"]) > score(["Ac", "Ad", "Kc", "Qc", "Tc"]));
    assert!(score(["Ac", "Qd", "9s", "7h", "3c"]) > score(["Ac", "Qd", "9s", "7h", "2c"]));
}

#[test]
fn cross_category_precedence() {
    let ladder = [
        score(["Ac", "Qd", "9s", "7h", "3c"]), // high card
        score(["Ac", "Ad", "Kc", "Qc", "Jc"]), // pair
        score(["Ac", "Ad", "Kc", "Kd", "Qc"]), // two pair
        score(["Qs", "Qh", "Qd", "Ac", "Kc"]), // trips
        score(["Ac", "Kd", "Qh", "Js", "Tc"]), // straight
        score(["As", "Qs", "9s", "7s", "2s"]), // flush
        score(["Ac", "Ad", "Ah", "Kc", "Kd"]), // full house
        score(["Ac", "Ad", "Ah", "As", "Kc"]), // quads
        score(["As", "Ks", "Qs", "Js", "Ts"]), // straight flush
    ];
    for w in ladder.windows(2) {
        assert!(w[0] < w[1]);
    }
}

#[test]
fn tie_equality_across_suits() {
    assert_eq!(
        score(["As", "Qs", "9s", "7s", "2s"]),
        score(["Ah", "Qh", "9h", "7h", "2h"])
    );
    assert_eq!(
        score(["9c", "8d", "7h", "6s", "5c"]),
        score(["9d", "8h", "7s", "6c", "5d"])
    );
}

#[test]
fn compare_hands_is_antisymmetric() {
    let a = HandRank::of_five(five(["As", "Ks", "Qs", "Js", "Ts"]));
    let b = HandRank::of_five(five(["Ac", "Ad", "Ah", "As", "Kc"]));
    assert_eq!(compare_hands(&a, &b), compare_hands(&b, &a).reverse());
    assert_eq!(compare_hands(&a, &a), core::cmp::Ordering::Equal);
}

#[test]
fn plo_uses_exactly_two_hole_cards() {
    // Board is four spades to a royal; hole has one spade. Hold'em rules
    // would read a flush here, Omaha must not: only one hole spade can play.
    let hole = [c("Ks"), c("Ah"), c("2d"), c("3c")];
    let board = [c("Qs"), c("Js"), c("Ts"), c("4s"), c("8d")];
    let rank = evaluate_plo(&hole, &board);
    assert_ne!(rank.category, HandCategory::Flush);
    assert_ne!(rank.category, HandCategory::StraightFlush);
    // Ks+Ah with QJT makes the ace-high straight.
    assert_eq!(rank.category, HandCategory::Straight);
    assert_eq!(rank.tiebreak[0], 14);
}

#[test]
fn plo_must_use_three_board_cards() {
    // Four aces in hole: pocket quads never play as quads, only as a pair of
    // aces plus three board cards.
    let hole = [c("Ac"), c("Ad"), c("Ah"), c("As")];
    let board = [c("Kc"), c("Qd"), c("7h"), c("4s"), c("2c")];
    let rank = evaluate_plo(&hole, &board);
    assert_eq!(rank.category, HandCategory::OnePair);
    assert_eq!(rank.tiebreak[0], 14);
}

#[test]
fn plo_finds_the_board_plus_hole_nuts() {
    let hole = [c("Ah"), c("Kh"), c("7d"), c("2c")];
    let board = [c("Qh"), c("Jh"), c("Th"), c("4s"), c("8d")];
    let rank = evaluate_plo(&hole, &board);
    assert_eq!(rank.category, HandCategory::StraightFlush);
    assert_eq!(rank.tiebreak[0], 14);
}

#[test]
fn evaluator_ignores_hole_card_order() {
    let board = [c("Qh"), c("Jh"), c("Th"), c("4s"), c("8d")];
    let a = evaluate_plo(&[c("Ah"), c("Kh"), c("7d"), c("2c")], &board);
    let b = evaluate_plo(&[c("7d"), c("Ah"), c("2c"), c("Kh")], &board);
    assert_eq!(a.score, b.score);
}

#[test]
fn wheel_straight_flush_ranks_below_six_high() {
    let wheel = evaluate_plo(
        &[c("Ad"), c("2d"), c("Kc"), c("Qc")],
        &[c("3d"), c("4d"), c("5d"), c("9h"), c("Ts")],
    );
    let six_high = evaluate_plo(
        &[c("6s"), c("5s"), c("Kc"), c("Qc")],
        &[c("4s"), c("3s"), c("2s"), c("9h"), c("Th")],
    );
    assert_eq!(wheel.category, HandCategory::StraightFlush);
    assert_eq!(six_high.category, HandCategory::StraightFlush);
    assert!(six_high.score > wheel.score);
}
