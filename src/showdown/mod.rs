//! Five-card classification and the PLO hand evaluator.
//!
//! Omaha hands use exactly two of the four hole cards and exactly three of
//! the five board cards, so the best hand is the maximum over the
//! C(4,2)*C(5,3) = 60 candidate five-card hands.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::cards::{sort_desc, Card, Rank};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8, // Royal is SF with high=14
}

impl HandCategory {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
        }
    }
}

/// Base-16 multipliers (no shifting) for packing (cat,c1..c5)
const M5: u32 = 1_048_576; // 16^5
const M4: u32 = 65_536; // 16^4
const M3: u32 = 4_096; // 16^3
const M2: u32 = 256; // 16^2
const M1: u32 = 16; // 16^1
const M0: u32 = 1; // 16^0

#[inline]
fn is_wheel_ranks(r: &[Rank; 5]) -> bool {
    r[0] == 5 && r[1] == 4 && r[2] == 3 && r[3] == 2 && r[4] == 14
}

#[inline]
fn is_run_desc_ranks(r: &[Rank; 5]) -> bool {
    r[0] == r[1] + 1 && r[1] == r[2] + 1 && r[2] == r[3] + 1 && r[3] == r[4] + 1
}

/// Pack (cat, c1..c5) into a u32 (base-16 digits; <= 16^6).
#[inline]
pub fn pack_score_u32(cat: HandCategory, c: [u8; 5]) -> u32 {
    (cat.as_u8() as u32) * M5
        + (c[0] as u32) * M4
        + (c[1] as u32) * M3
        + (c[2] as u32) * M2
        + (c[3] as u32) * M1
        + (c[4] as u32) * M0
}

/// Category-specific tie-break vector from a canonical 5-card hand.
pub fn tiebreak_vector(cat: HandCategory, h: &[Card; 5]) -> [u8; 5] {
    let r = [h[0].rank, h[1].rank, h[2].rank, h[3].rank, h[4].rank];
    match cat {
        HandCategory::StraightFlush | HandCategory::Straight => {
            let high = if is_wheel_ranks(&r) { 5 } else { r[0] };
            [high, 0, 0, 0, 0]
        }
        HandCategory::FourOfAKind => [r[0], r[4], 0, 0, 0],
        HandCategory::FullHouse => [r[0], r[3], 0, 0, 0],
        HandCategory::Flush => [r[0], r[1], r[2], r[3], r[4]],
        HandCategory::ThreeOfAKind => [r[0], r[3], r[4], 0, 0],
        HandCategory::TwoPair => [r[0], r[2], r[4], 0, 0],
        HandCategory::OnePair => [r[0], r[2], r[3], r[4], 0],
        HandCategory::HighCard => [r[0], r[1], r[2], r[3], r[4]],
    }
}

/// Classify any 5 cards and return (category, canonical 5)
pub fn classify_five_and_canonicalize(h5: [Card; 5]) -> (HandCategory, [Card; 5]) {
    let mut s = h5;
    sort_desc(&mut s);

    // Hist counts by rank
    let mut cnt = [0u8; 15]; // 0..14
    for c in s.iter() {
        cnt[c.rank as usize] += 1;
    }

    let same_suit = s.iter().all(|c| c.suit == s[0].suit);

    // Distinct ranks in desc order (input already sorted)
    let mut uniq: Vec<Rank> = s.iter().map(|c| c.rank).collect();
    uniq.dedup();

    // Straight detection (only if 5 distinct ranks)
    let (has_straight, straight_ranks): (bool, [Rank; 5]) = if uniq.len() == 5 {
        let r = [uniq[0], uniq[1], uniq[2], uniq[3], uniq[4]];
        if is_run_desc_ranks(&r) {
            (true, r)
        } else {
            let mut set = r;
            set.sort_unstable(); // asc
            if set == [2, 3, 4, 5, 14] {
                (true, [5, 4, 3, 2, 14])
            } else {
                (false, [0; 5])
            }
        }
    } else {
        (false, [0; 5])
    };

    // Straight Flush
    if has_straight && same_suit {
        let suit = s[0].suit;
        let k: [Card; 5] = std::array::from_fn(|i| {
            *s.iter()
                .find(|c| c.rank == straight_ranks[i] && c.suit == suit)
                .unwrap()
        });
        return (HandCategory::StraightFlush, k);
    }
    // Four of a kind
    if let Some((x_rank, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c == 4)
    {
        let quads: Vec<Card> = s.iter().filter(|c| c.rank == x_rank).cloned().collect();
        let kicker = s.iter().cloned().find(|c| c.rank != x_rank).unwrap();
        return (
            HandCategory::FourOfAKind,
            [quads[0], quads[1], quads[2], quads[3], kicker],
        );
    }
    // Full House
    let trips_ranks: Vec<Rank> = (2..=14).rev().filter(|&r| cnt[r as usize] >= 3).collect();
    if !trips_ranks.is_empty() {
        let t = trips_ranks[0];
        let pair_cands: Vec<Rank> = (2..=14)
            .rev()
            .filter(|&r| r != t && cnt[r as usize] >= 2)
            .collect();
        if !pair_cands.is_empty() {
            let p = pair_cands[0];
            let trips: Vec<Card> = s.iter().filter(|c| c.rank == t).take(3).cloned().collect();
            let pair: Vec<Card> = s.iter().filter(|c| c.rank == p).take(2).cloned().collect();
            return (
                HandCategory::FullHouse,
                [trips[0], trips[1], trips[2], pair[0], pair[1]],
            );
        }
    }
    // Flush (not straight flush)
    if same_suit {
        return (HandCategory::Flush, s);
    }
    // Straight (not flush)
    if has_straight {
        // choose any suit per rank, deterministically prefer higher suit id
        let k: [Card; 5] = std::array::from_fn(|i| {
            s.iter()
                .filter(|c| c.rank == straight_ranks[i])
                .max_by_key(|c| c.suit)
                .cloned()
                .unwrap()
        });
        return (HandCategory::Straight, k);
    }
    // Trips
    if let Some((t, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c >= 3)
    {
        let trips: Vec<Card> = s.iter().filter(|c| c.rank == t).take(3).cloned().collect();
        let mut kickers: Vec<Card> = s.iter().filter(|c| c.rank != t).cloned().collect();
        sort_desc(&mut kickers);
        return (
            HandCategory::ThreeOfAKind,
            [trips[0], trips[1], trips[2], kickers[0], kickers[1]],
        );
    }
    // Two Pair
    let pairs: Vec<Rank> = (2..=14).rev().filter(|&r| cnt[r as usize] >= 2).collect();
    if pairs.len() >= 2 {
        let hi = pairs[0];
        let lo = pairs[1];
        let hi_pair: Vec<Card> = s.iter().filter(|c| c.rank == hi).take(2).cloned().collect();
        let lo_pair: Vec<Card> = s.iter().filter(|c| c.rank == lo).take(2).cloned().collect();
        let kicker = s
            .iter()
            .cloned()
            .find(|c| c.rank != hi && c.rank != lo)
            .unwrap();
        return (
            HandCategory::TwoPair,
            [hi_pair[0], hi_pair[1], lo_pair[0], lo_pair[1], kicker],
        );
    }
    // One Pair
    if let Some((p, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c >= 2)
    {
        let pair: Vec<Card> = s.iter().filter(|c| c.rank == p).take(2).cloned().collect();
        let mut kickers: Vec<Card> = s.iter().filter(|c| c.rank != p).cloned().collect();
        sort_desc(&mut kickers);
        return (
            HandCategory::OnePair,
            [pair[0], pair[1], kickers[0], kickers[1], kickers[2]],
        );
    }
    // High Card
    (HandCategory::HighCard, s)
}

/// A fully evaluated hand: category, canonical 5 cards, and the packed score
/// that induces the total order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandRank {
    pub category: HandCategory,
    pub cards: [Card; 5],
    pub tiebreak: [u8; 5],
    pub score: u32,
}

impl HandRank {
    pub fn of_five(h5: [Card; 5]) -> Self {
        let (category, canonical) = classify_five_and_canonicalize(h5);
        let tiebreak = tiebreak_vector(category, &canonical);
        HandRank {
            category,
            cards: canonical,
            tiebreak,
            score: pack_score_u32(category, tiebreak),
        }
    }
}


/// The two-of-four hole pairs, fixed for the 60-way enumeration.
const HOLE_PAIRS: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];

/// The three-of-five board triples.
const BOARD_TRIPLES: [(usize, usize, usize); 10] = [
    (0, 1, 2),
    (0, 1, 3),
    (0, 1, 4),
    (0, 2, 3),
    (0, 2, 4),
    (0, 3, 4),
    (1, 2, 3),
    (1, 2, 4),
    (1, 3, 4),
    (2, 3, 4),
];

/// Best PLO hand from exactly two hole cards plus exactly three board cards.
pub fn evaluate_plo(hole: &[Card; 4], board: &[Card; 5]) -> HandRank {
    let mut best: Option<HandRank> = None;
    for &(a, b) in &HOLE_PAIRS {
        for &(x, y, z) in &BOARD_TRIPLES {
            let rank = HandRank::of_five([hole[a], hole[b], board[x], board[y], board[z]]);
            if best.map_or(true, |cur| rank.score > cur.score) {
                best = Some(rank);
            }
        }
    }
    best.unwrap()
}

/// Sign of `a` versus `b` under the evaluator's total order: the packed
/// score alone decides; equal scores are ties regardless of suits.
pub fn compare_hands(a: &HandRank, b: &HandRank) -> Ordering {
    a.score.cmp(&b.score)
}

#[cfg(test)]
mod tests;
