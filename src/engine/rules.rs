//! Pot-limit betting arithmetic and side-pot computation.

use super::state::HandState;
use super::types::{Chips, PlayerStatus, Pot, Pots, SeatId};

impl HandState {
    /// Chips this seat must add to match the current bet.
    pub fn price_to_call(&self, seat: SeatId) -> Chips {
        let Some(p) = self.player(seat) else { return 0 };
        if p.status != PlayerStatus::Active {
            return 0;
        }
        self.current_bet.saturating_sub(p.committed_this_street)
    }

    /// Pot-limit cap on an opening bet: the size of the pot, never below one
    /// big blind.
    pub fn max_bet_to(&self) -> Chips {
        self.pot_size().max(self.stakes.big_blind)
    }

    /// Pot-limit cap on a raise, as a street total for `seat`:
    /// call amount plus the pot after that call, i.e.
    /// `committed + to_call + (pot + to_call)`.
    pub fn max_raise_to(&self, seat: SeatId) -> Chips {
        let committed = self
            .player(seat)
            .map(|p| p.committed_this_street)
            .unwrap_or(0);
        let to_call = self.price_to_call(seat);
        committed + to_call + self.pot_size() + to_call
    }

    /// A raise reopens action only when its increment reaches the last full
    /// raise. Short all-ins below that do not reopen.
    pub fn is_full_raise(&self, raise_amount: Chips) -> bool {
        raise_amount >= self.last_full_raise && self.last_full_raise > 0
    }

    /// Whether `seat` may raise at this decision point. True when the seat
    /// has not yet acted this street; a full raise re-grants action by
    /// clearing `has_acted_this_street` for everyone else.
    pub fn may_raise(&self, seat: SeatId) -> bool {
        self.player(seat)
            .map(|p| p.status == PlayerStatus::Active && !p.has_acted_this_street)
            .unwrap_or(false)
    }

    /// Side-pot layering from total commitments: one tier per distinct
    /// non-folded contribution level, eligible seats being the non-folded
    /// contributors at or above the tier cap.
    pub fn compute_pots(&self) -> Pots {
        let contrib: Vec<(SeatId, Chips, PlayerStatus)> = self
            .players
            .iter()
            .map(|p| (p.seat, p.total_committed(), p.status))
            .collect();

        let mut thresholds: Vec<Chips> = contrib
            .iter()
            .filter(|(_, c, s)| *c > 0 && *s != PlayerStatus::Folded)
            .map(|(_, c, _)| *c)
            .collect();
        thresholds.sort_unstable();
        thresholds.dedup();

        if thresholds.is_empty() {
            let total: Chips = contrib.iter().map(|(_, c, _)| *c).sum();
            return Pots {
                main: Pot {
                    amount: total,
                    eligible: vec![],
                },
                sides: vec![],
            };
        }

        let mut pots: Vec<Pot> = Vec::new();
        let mut prev_cap: Chips = 0;
        for cap in thresholds.iter().copied() {
            let tier = cap - prev_cap;
            let mut amount: Chips = 0;
            for (_, c, _) in contrib.iter() {
                amount += (*c).saturating_sub(prev_cap).min(tier);
            }
            let mut eligible: Vec<SeatId> = contrib
                .iter()
                .filter(|(_, c, s)| *s != PlayerStatus::Folded && *c >= cap)
                .map(|(sid, _, _)| *sid)
                .collect();
            eligible.sort_unstable();
            pots.push(Pot { amount, eligible });
            prev_cap = cap;
        }

        // Folded chips above the highest live commitment still belong to the
        // pot; fold them into the last tier.
        let leftover: Chips = contrib
            .iter()
            .map(|(_, c, _)| (*c).saturating_sub(prev_cap))
            .sum();
        if let Some(last) = pots.last_mut() {
            last.amount += leftover;
        }

        let main = pots.remove(0);
        Pots { main, sides: pots }
    }

    pub fn refresh_pots(&mut self) {
        self.pots = self.compute_pots();
    }
}
