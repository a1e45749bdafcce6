//! Blind posting, hole-card dealing, and community reveals.

use super::errors::StateError;
use super::state::HandState;
use super::types::{Chips, LoggedAction, NormalizedAction, PlayerStatus, SeatId, Street};
use crate::cards::Card;

pub(super) const HOLE_CARDS: usize = 4;

impl HandState {
    /// Post a forced wager for `seat`, going all-in when the stack is short.
    fn post_blind(&mut self, seat: SeatId, amount: Chips, small: bool) {
        let street = self.street;
        let Some(p) = self.player_mut(seat) else { return };
        let posted = amount.min(p.stack);
        p.stack -= posted;
        p.committed_this_street += posted;
        if p.stack == 0 {
            p.status = PlayerStatus::AllIn;
        }
        let action = if small {
            NormalizedAction::PostSmallBlind { amount: posted }
        } else {
            NormalizedAction::PostBigBlind { amount: posted }
        };
        self.action_log.push(LoggedAction {
            street,
            seat,
            action,
        });
    }

    /// Posts both blinds and sets the preflop bet-to-match.
    pub(super) fn post_blinds(&mut self) {
        let (sb, bb) = (self.stakes.small_blind, self.stakes.big_blind);
        self.post_blind(self.sb_seat, sb, true);
        self.post_blind(self.bb_seat, bb, false);
        self.current_bet = self
            .players
            .iter()
            .map(|p| p.committed_this_street)
            .max()
            .unwrap_or(0);
        self.last_full_raise = bb;
        self.voluntary_bet_opened = false;
        self.last_aggressor = None;
    }

    /// Four passes of one card per eligible seat, starting left of the button
    /// (the small blind first).
    pub(super) fn deal_hole_cards(&mut self) -> Result<(), StateError> {
        let order: Vec<SeatId> = {
            let mut order = Vec::new();
            let mut seat = self.button;
            for _ in 0..super::types::MAX_SEATS {
                seat = (seat + 1) % super::types::MAX_SEATS as u8;
                if self
                    .player(seat)
                    .map(|p| p.is_in_hand())
                    .unwrap_or(false)
                {
                    order.push(seat);
                }
            }
            order
        };

        for _pass in 0..HOLE_CARDS {
            for &seat in &order {
                let card = self.deck.draw().ok_or(StateError::DeckExhausted)?;
                if let Some(p) = self.player_mut(seat) {
                    p.hole_cards.push(card);
                }
            }
        }
        Ok(())
    }

    /// Reveal the community cards for `street`, returning the new cards.
    pub(super) fn reveal_community(&mut self, street: Street) -> Result<Vec<Card>, StateError> {
        let target = street.community_len();
        let need = target.saturating_sub(self.community.len());
        if need == 0 {
            return Ok(Vec::new());
        }
        let drawn = self
            .deck
            .draw_many(need)
            .ok_or(StateError::DeckExhausted)?;
        self.community.extend(drawn.iter().copied());
        Ok(drawn)
    }
}
