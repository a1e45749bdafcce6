//! Decision logic: preflop hand scoring, postflop made-hand strength with
//! nut and draw analysis, pot-odds discipline, pot-limit sizing.

use super::{BotDecision, BotView};
use crate::cards::{Card, Deck, Rank, Suit};
use crate::engine::types::ActionKind;
use crate::engine::ValidAction;
use crate::showdown::{classify_five_and_canonicalize, evaluate_plo, HandCategory, HandRank};

/// Entry point: choose one of the offered actions. Always returns an action
/// from `view.valid_actions`.
pub fn decide(view: &BotView) -> BotDecision {
    if view.valid_actions.is_empty() {
        return BotDecision::of(ActionKind::Fold);
    }
    if view.community.is_empty() {
        decide_preflop(view)
    } else {
        decide_postflop(view)
    }
}

// -------------------------------------------------------------------------
// Preflop
// -------------------------------------------------------------------------

/// Score a four-card starting hand, roughly 0..=100. Pairs, double-suited
/// textures, connected rundowns and high cards all add; danglers subtract.
pub fn preflop_score(hole: &[Card; 4]) -> i32 {
    let mut ranks: Vec<Rank> = hole.iter().map(|c| c.rank).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let mut score: i32 = 0;

    // High-card base.
    score += ranks.iter().map(|&r| r as i32 - 6).filter(|v| *v > 0).sum::<i32>();

    // Pairs: aces dominate, trips and quads play badly.
    let mut counts = [0u8; 15];
    for &r in &ranks {
        counts[r as usize] += 1;
    }
    for r in 2..=14u8 {
        match counts[r as usize] {
            2 => score += (r as i32) * 2,
            3 => score -= 6,
            4 => score -= 14,
            _ => {}
        }
    }

    // Suitedness: a suited ace is worth most; double-suited adds again.
    let mut suited_groups = 0;
    for suit in Suit::ALL {
        let in_suit: Vec<Rank> = hole
            .iter()
            .filter(|c| c.suit == suit)
            .map(|c| c.rank)
            .collect();
        if in_suit.len() >= 2 {
            suited_groups += 1;
            score += 6;
            if in_suit.contains(&14) {
                score += 6;
            }
        }
        if in_suit.len() >= 3 {
            // A third card of the suit blocks our own flush outs.
            score -= 4;
        }
    }
    if suited_groups >= 2 {
        score += 8;
    }

    // Connectivity: the tighter the four-card span, the better the wraps.
    let span = ranks[0] as i32 - ranks[3] as i32;
    score += match span {
        0..=3 => 16,
        4..=5 => 10,
        6..=7 => 4,
        _ => 0,
    };
    // A dangler (card far below the other three) drags the hand down.
    if ranks[2] as i32 - ranks[3] as i32 >= 5 {
        score -= 8;
    }

    score
}

fn decide_preflop(view: &BotView) -> BotDecision {
    let score = preflop_score(&view.hole_cards);
    let raise = find(view, ActionKind::Raise).or_else(|| find(view, ActionKind::Bet));

    // Thresholds tighten out of position and loosen a little shorthanded.
    let mut raise_at = 58;
    let mut play_at = 34;
    if view.in_position {
        raise_at -= 4;
        play_at -= 4;
    }
    if view.opponents <= 2 {
        raise_at -= 6;
        play_at -= 8;
    }

    if score >= raise_at {
        if let Some(r) = raise {
            // Pot-sized open, clamped to the offered range.
            let target = (view.pot + 2 * view.to_call).max(3 * view.big_blind);
            return BotDecision::sized(r.action, target.clamp(r.min_amount, r.max_amount));
        }
    }
    if score >= play_at {
        // Call anything reasonably priced against the pot.
        if view.to_call == 0 {
            if can(view, ActionKind::Check) {
                return BotDecision::of(ActionKind::Check);
            }
        } else if view.to_call <= view.pot.max(view.big_blind * 4) && can(view, ActionKind::Call) {
            return BotDecision::of(ActionKind::Call);
        }
    }
    fallback_passive(view)
}

// -------------------------------------------------------------------------
// Postflop
// -------------------------------------------------------------------------

/// How the made hand sits against what the board allows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MadeStrength {
    Air,
    Weak,
    Medium,
    Strong,
    Nuts,
}

/// The best hand any opponent could currently hold on this board, scored the
/// hold'em way (two unknown cards against three board cards).
pub fn board_nut_score(board: &[Card], dead: &[Card]) -> u32 {
    let mut deck = Deck::new();
    let mut remaining: Vec<Card> = Vec::with_capacity(45);
    while let Some(c) = deck.draw() {
        if !board.contains(&c) && !dead.contains(&c) {
            remaining.push(c);
        }
    }

    let mut best = 0u32;
    for i in 0..remaining.len() {
        for j in (i + 1)..remaining.len() {
            best = best.max(best_with_pair(remaining[i], remaining[j], board));
        }
    }
    best
}

fn best_with_pair(a: Card, b: Card, board: &[Card]) -> u32 {
    let mut best = 0u32;
    let n = board.len();
    for x in 0..n {
        for y in (x + 1)..n {
            for z in (y + 1)..n {
                let (cat, canon) =
                    classify_five_and_canonicalize([a, b, board[x], board[y], board[z]]);
                let tb = crate::showdown::tiebreak_vector(cat, &canon);
                best = best.max(crate::showdown::pack_score_u32(cat, tb));
            }
        }
    }
    best
}

/// One-card outs: rivers/turns that lift us to at least a straight.
pub fn count_outs(hole: &[Card; 4], board: &[Card]) -> usize {
    if board.len() >= 5 {
        return 0;
    }
    let mut deck = Deck::new();
    let mut outs = 0;
    while let Some(c) = deck.draw() {
        if board.contains(&c) || hole.contains(&c) {
            continue;
        }
        let mut next = board.to_vec();
        next.push(c);
        if best_now(hole, &next).category >= HandCategory::Straight {
            outs += 1;
        }
    }
    outs
}

/// Whether we hold the ace of a three-flush board's suit without the flush:
/// the nut-flush blocker.
pub fn holds_nut_flush_blocker(hole: &[Card; 4], board: &[Card]) -> bool {
    for suit in Suit::ALL {
        let on_board = board.iter().filter(|c| c.suit == suit).count();
        if on_board >= 3 {
            let we_block = hole.iter().any(|c| c.suit == suit && c.rank == 14);
            let we_have_flush = hole.iter().filter(|c| c.suit == suit).count() >= 2;
            return we_block && !we_have_flush;
        }
    }
    false
}

/// Best current hand over any board length >= 3 (pads nothing; uses the
/// PLO rule on the full board, a best-effort on partial streets).
fn best_now(hole: &[Card; 4], board: &[Card]) -> HandRank {
    if board.len() == 5 {
        let full: [Card; 5] = board.try_into().expect("five cards");
        return evaluate_plo(hole, &full);
    }
    // Partial board: exactly two hole cards plus all three-card subsets.
    let mut best: Option<HandRank> = None;
    let n = board.len();
    for a in 0..4 {
        for b in (a + 1)..4 {
            for x in 0..n {
                for y in (x + 1)..n {
                    for z in (y + 1)..n {
                        let rank = HandRank::of_five([
                            hole[a], hole[b], board[x], board[y], board[z],
                        ]);
                        if best.map_or(true, |cur| rank.score > cur.score) {
                            best = Some(rank);
                        }
                    }
                }
            }
        }
    }
    best.expect("at least three board cards")
}

pub fn classify_strength(hole: &[Card; 4], board: &[Card]) -> MadeStrength {
    let rank = best_now(hole, board);
    if rank.score >= board_nut_score(board, hole) {
        return MadeStrength::Nuts;
    }
    match rank.category {
        HandCategory::HighCard => MadeStrength::Air,
        HandCategory::OnePair => MadeStrength::Weak,
        HandCategory::TwoPair | HandCategory::ThreeOfAKind => MadeStrength::Medium,
        _ => MadeStrength::Strong,
    }
}

fn decide_postflop(view: &BotView) -> BotDecision {
    let strength = classify_strength(&view.hole_cards, &view.community);
    let outs = count_outs(&view.hole_cards, &view.community);
    let blocker = holds_nut_flush_blocker(&view.hole_cards, &view.community);

    let aggressive = find(view, ActionKind::Bet).or_else(|| find(view, ActionKind::Raise));

    match strength {
        MadeStrength::Nuts | MadeStrength::Strong => {
            if let Some(a) = aggressive {
                let target = view.pot.max(view.big_blind * 2);
                return BotDecision::sized(a.action, target.clamp(a.min_amount, a.max_amount));
            }
            if can(view, ActionKind::Call) {
                return BotDecision::of(ActionKind::Call);
            }
            if can(view, ActionKind::AllIn) && view.to_call >= view.stack {
                return BotDecision::of(ActionKind::AllIn);
            }
            fallback_passive(view)
        }
        MadeStrength::Medium => {
            if view.to_call == 0 {
                // Value-bet in position, otherwise keep the pot small.
                if view.in_position {
                    if let Some(a) = aggressive {
                        let target = (view.pot / 2).max(view.big_blind);
                        return BotDecision::sized(
                            a.action,
                            target.clamp(a.min_amount, a.max_amount),
                        );
                    }
                }
                return fallback_passive(view);
            }
            if priced_in(view, equity_estimate(strength, outs, view)) {
                return call_or_fold(view);
            }
            BotDecision::of(ActionKind::Fold)
        }
        MadeStrength::Air | MadeStrength::Weak => {
            // Big wraps and nut-flush draws play on; blockers bluff the
            // occasional turn when checked to.
            if view.to_call == 0 {
                if outs >= 13 || (blocker && view.in_position && view.community.len() == 4) {
                    if let Some(a) = aggressive {
                        let target = (view.pot * 2 / 3).max(view.big_blind);
                        return BotDecision::sized(
                            a.action,
                            target.clamp(a.min_amount, a.max_amount),
                        );
                    }
                }
                return fallback_passive(view);
            }
            if outs > 0 && priced_in(view, equity_estimate(strength, outs, view)) {
                return call_or_fold(view);
            }
            BotDecision::of(ActionKind::Fold)
        }
    }
}

/// Rough equity: outs at ~2% per card to come, floored by made strength.
fn equity_estimate(strength: MadeStrength, outs: usize, view: &BotView) -> f64 {
    let streets_left = (5usize.saturating_sub(view.community.len())) as f64;
    let draw_equity = (outs as f64 * 0.021 * streets_left).min(0.65);
    let made_floor = match strength {
        MadeStrength::Nuts => 0.9,
        MadeStrength::Strong => 0.7,
        MadeStrength::Medium => 0.45,
        MadeStrength::Weak => 0.2,
        MadeStrength::Air => 0.05,
    };
    draw_equity.max(made_floor)
}

fn priced_in(view: &BotView, equity: f64) -> bool {
    if view.to_call == 0 {
        return true;
    }
    let price = view.to_call as f64 / (view.pot + view.to_call) as f64;
    equity > price
}

fn call_or_fold(view: &BotView) -> BotDecision {
    if can(view, ActionKind::Call) {
        BotDecision::of(ActionKind::Call)
    } else if can(view, ActionKind::AllIn) && view.to_call >= view.stack {
        BotDecision::of(ActionKind::AllIn)
    } else {
        BotDecision::of(ActionKind::Fold)
    }
}

fn fallback_passive(view: &BotView) -> BotDecision {
    if can(view, ActionKind::Check) {
        BotDecision::of(ActionKind::Check)
    } else {
        BotDecision::of(ActionKind::Fold)
    }
}

fn find(view: &BotView, kind: ActionKind) -> Option<&ValidAction> {
    view.valid_actions.iter().find(|v| v.action == kind)
}

fn can(view: &BotView, kind: ActionKind) -> bool {
    find(view, kind).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Chips;

    fn c(s: &str) -> Card {
        s.parse().unwrap()
    }

    fn hole(a: &str, b: &str, x: &str, y: &str) -> [Card; 4] {
        [c(a), c(b), c(x), c(y)]
    }

    fn board(cards: &[&str]) -> Vec<Card> {
        cards.iter().map(|s| c(s)).collect()
    }

    fn action(kind: ActionKind, min: Chips, max: Chips) -> ValidAction {
        ValidAction {
            action: kind,
            min_amount: min,
            max_amount: max,
        }
    }

    fn view(
        hole_cards: [Card; 4],
        community: Vec<Card>,
        pot: Chips,
        to_call: Chips,
        valid: Vec<ValidAction>,
    ) -> BotView {
        BotView {
            hole_cards,
            community,
            pot,
            to_call,
            stack: 300,
            big_blind: 3,
            opponents: 3,
            in_position: false,
            valid_actions: valid,
        }
    }

    #[test]
    fn premium_double_suited_aces_outscore_junk() {
        let aces = preflop_score(&hole("Ah", "Ad", "Kh", "Kd"));
        let rundown = preflop_score(&hole("9h", "8h", "7c", "6c"));
        let junk = preflop_score(&hole("2c", "7d", "Jh", "2s"));
        assert!(aces > rundown);
        assert!(rundown > junk);
    }

    #[test]
    fn trips_in_hand_are_devalued() {
        let trips = preflop_score(&hole("Kh", "Kd", "Kc", "7s"));
        let two_pair = preflop_score(&hole("Kh", "Kd", "7c", "7s"));
        assert!(two_pair > trips);
    }

    #[test]
    fn premium_hand_opens_with_a_raise() {
        let v = view(
            hole("Ah", "Ad", "Kh", "Kd"),
            vec![],
            4,
            3,
            vec![
                action(ActionKind::Fold, 0, 0),
                action(ActionKind::Call, 3, 3),
                action(ActionKind::Raise, 6, 13),
            ],
        );
        let d = decide(&v);
        assert_eq!(d.action, ActionKind::Raise);
        let amount = d.amount.unwrap();
        assert!((6..=13).contains(&amount));
    }

    #[test]
    fn junk_folds_to_a_raise_preflop() {
        let v = view(
            hole("2c", "7d", "Jh", "2s"),
            vec![],
            20,
            15,
            vec![
                action(ActionKind::Fold, 0, 0),
                action(ActionKind::Call, 15, 15),
            ],
        );
        assert_eq!(decide(&v).action, ActionKind::Fold);
    }

    #[test]
    fn junk_checks_when_free() {
        let v = view(
            hole("2c", "7d", "Jh", "2s"),
            vec![],
            6,
            0,
            vec![
                action(ActionKind::Check, 0, 0),
                action(ActionKind::Bet, 3, 6),
            ],
        );
        assert_eq!(decide(&v).action, ActionKind::Check);
    }

    #[test]
    fn nut_flush_bets_the_pot() {
        let v = view(
            hole("Ah", "Kh", "2c", "3d"),
            board(&["Qh", "7h", "2h", "9s", "4c"]),
            30,
            0,
            vec![
                action(ActionKind::Check, 0, 0),
                action(ActionKind::Bet, 3, 30),
            ],
        );
        let d = decide(&v);
        assert_eq!(d.action, ActionKind::Bet);
        assert_eq!(d.amount, Some(30));
        assert_eq!(
            classify_strength(&v.hole_cards, &v.community),
            MadeStrength::Nuts
        );
    }

    #[test]
    fn sizing_respects_the_offered_range() {
        let v = view(
            hole("Ah", "Kh", "2c", "3d"),
            board(&["Qh", "7h", "2h", "9s", "4c"]),
            300,
            0,
            vec![
                action(ActionKind::Check, 0, 0),
                action(ActionKind::Bet, 3, 40), // stack-capped
            ],
        );
        let d = decide(&v);
        assert_eq!(d.action, ActionKind::Bet);
        assert_eq!(d.amount, Some(40));
    }

    #[test]
    fn air_folds_to_a_big_river_bet() {
        let v = view(
            hole("6c", "5d", "Th", "Js"),
            board(&["Ah", "Kd", "8s", "2c", "2d"]),
            60,
            45,
            vec![
                action(ActionKind::Fold, 0, 0),
                action(ActionKind::Call, 45, 45),
            ],
        );
        assert_eq!(decide(&v).action, ActionKind::Fold);
    }

    #[test]
    fn big_wrap_calls_a_cheap_flop_bet() {
        // 13+ outs to a straight on a dry flop, tiny price.
        let hole_cards = hole("Jh", "Tc", "9d", "8s");
        let community = board(&["7h", "6d", "2c"]);
        assert!(count_outs(&hole_cards, &community) >= 13);
        let v = view(
            hole_cards,
            community,
            40,
            2,
            vec![
                action(ActionKind::Fold, 0, 0),
                action(ActionKind::Call, 2, 2),
                action(ActionKind::Raise, 10, 44),
            ],
        );
        assert_eq!(decide(&v).action, ActionKind::Call);
    }

    #[test]
    fn nut_blocker_detection() {
        let hole_cards = hole("Ah", "2c", "9d", "8s");
        let community = board(&["Qh", "7h", "2h", "9s"]);
        assert!(holds_nut_flush_blocker(&hole_cards, &community));
        // Holding the flush itself is not a blocker situation.
        let flush = hole("Ah", "3h", "9d", "8s");
        assert!(!holds_nut_flush_blocker(&flush, &community));
        // No three-flush on board, no blocker.
        assert!(!holds_nut_flush_blocker(
            &hole_cards,
            &board(&["Qh", "7h", "2c"])
        ));
    }

    #[test]
    fn decision_is_deterministic() {
        let v = view(
            hole("Ah", "Ad", "Kh", "Kd"),
            vec![],
            4,
            3,
            vec![
                action(ActionKind::Fold, 0, 0),
                action(ActionKind::Call, 3, 3),
                action(ActionKind::Raise, 6, 13),
            ],
        );
        let first = decide(&v);
        for _ in 0..10 {
            assert_eq!(decide(&v), first);
        }
    }

    #[test]
    fn always_picks_an_offered_action() {
        let offered = vec![
            action(ActionKind::Fold, 0, 0),
            action(ActionKind::Call, 10, 10),
        ];
        let v = view(
            hole("Qc", "Jd", "Th", "9s"),
            board(&["Ah", "Kd", "8s"]),
            30,
            10,
            offered.clone(),
        );
        let d = decide(&v);
        assert!(offered.iter().any(|a| a.action == d.action));
    }
}
