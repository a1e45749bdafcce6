//! The six-seat roster of one table.

use std::sync::Arc;

use thiserror::Error;

use crate::engine::types::{Chips, SeatId, UserId, MAX_SEATS};
use crate::session::SessionHandle;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeatError {
    #[error("table is full")]
    TableFull,
    #[error("player is already seated")]
    AlreadySeated,
    #[error("server is in maintenance")]
    Maintenance,
}

/// One occupied seat. The slot owns the chip balance; the session is only a
/// routing reference and may be absent while disconnected.
#[derive(Debug)]
pub struct SeatSlot {
    pub user_id: UserId,
    pub name: String,
    pub avatar: Option<String>,
    pub is_bot: bool,
    pub session: Option<Arc<SessionHandle>>,
    pub chips: Chips,
    pub buy_in: Chips,
    /// Seated mid-hand: excluded until the next deal.
    pub waiting_for_next_hand: bool,
    /// Fast-fold move in flight: the slot survives the current hand
    /// socket-less and is dropped, not cashed out, at hand end.
    pub left_for_fast_fold: bool,
    /// Disconnected or leaving: cash out at the first safe moment.
    pub pending_unseat: bool,
}

impl SeatSlot {
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.is_connected())
            .unwrap_or(false)
    }

    /// Eligible to be dealt into a new hand.
    pub fn can_play(&self) -> bool {
        self.chips > 0
            && !self.waiting_for_next_hand
            && !self.left_for_fast_fold
            && !self.pending_unseat
    }
}

/// Six fixed slots, indexed 0..=5.
#[derive(Debug, Default)]
pub struct SeatManager {
    slots: [Option<SeatSlot>; MAX_SEATS],
}

impl SeatManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a player in the first free slot (honouring a free preferred
    /// index), charging nothing here; the buy-in was already debited.
    pub fn seat_player(
        &mut self,
        user_id: UserId,
        name: String,
        avatar: Option<String>,
        is_bot: bool,
        session: Option<Arc<SessionHandle>>,
        chips: Chips,
        preferred: Option<SeatId>,
        hand_in_progress: bool,
    ) -> Result<SeatId, SeatError> {
        if self.seat_of(&user_id).is_some() {
            return Err(SeatError::AlreadySeated);
        }
        let seat = preferred
            .filter(|&s| (s as usize) < MAX_SEATS && self.slots[s as usize].is_none())
            .or_else(|| self.first_free())
            .ok_or(SeatError::TableFull)?;
        self.slots[seat as usize] = Some(SeatSlot {
            user_id,
            name,
            avatar,
            is_bot,
            session,
            chips,
            buy_in: chips,
            waiting_for_next_hand: hand_in_progress,
            left_for_fast_fold: false,
            pending_unseat: false,
        });
        Ok(seat)
    }

    /// Clear the slot, returning its chip balance for the bankroll refund.
    pub fn unseat_player(&mut self, seat: SeatId) -> Option<(UserId, Chips)> {
        self.slots[seat as usize]
            .take()
            .map(|slot| (slot.user_id, slot.chips))
    }

    /// Fast-fold departure: the hand in flight still references this seat,
    /// so the slot stays but no longer routes or rejoins.
    pub fn mark_left_for_fast_fold(&mut self, seat: SeatId) {
        if let Some(slot) = self.slots[seat as usize].as_mut() {
            slot.left_for_fast_fold = true;
            slot.session = None;
            slot.chips = 0; // carried to the new table, not cashed out here
        }
    }

    pub fn get(&self, seat: SeatId) -> Option<&SeatSlot> {
        self.slots.get(seat as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, seat: SeatId) -> Option<&mut SeatSlot> {
        self.slots.get_mut(seat as usize)?.as_mut()
    }

    pub fn seat_of(&self, user_id: &str) -> Option<SeatId> {
        self.iter()
            .find(|(_, slot)| slot.user_id == user_id)
            .map(|(seat, _)| seat)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SeatId, &SeatSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|slot| (i as SeatId, slot)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SeatId, &mut SeatSlot)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|slot| (i as SeatId, slot)))
    }

    fn first_free(&self) -> Option<SeatId> {
        self.slots
            .iter()
            .position(|s| s.is_none())
            .map(|i| i as SeatId)
    }

    pub fn seated_count(&self) -> usize {
        self.iter().count()
    }

    pub fn connected_count(&self) -> usize {
        self.iter().filter(|(_, s)| s.is_connected()).count()
    }

    pub fn has_available_seat(&self) -> bool {
        self.seated_count() < MAX_SEATS
    }

    /// Seats eligible for the next deal.
    pub fn playable_seats(&self) -> Vec<SeatId> {
        self.iter()
            .filter(|(_, s)| s.can_play())
            .map(|(seat, _)| seat)
            .collect()
    }

    /// New hand: everyone seated becomes eligible again.
    pub fn clear_waiting_flags(&mut self) {
        for (_, slot) in self.iter_mut() {
            slot.waiting_for_next_hand = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(m: &mut SeatManager, user: &str, chips: Chips) -> SeatId {
        m.seat_player(
            user.to_string(),
            user.to_string(),
            None,
            false,
            None,
            chips,
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn seats_fill_in_order_and_honour_preference() {
        let mut m = SeatManager::new();
        assert_eq!(seat(&mut m, "a", 100), 0);
        assert_eq!(seat(&mut m, "b", 100), 1);
        let chosen = m
            .seat_player(
                "c".into(),
                "c".into(),
                None,
                false,
                None,
                100,
                Some(4),
                false,
            )
            .unwrap();
        assert_eq!(chosen, 4);
        // Taken preference falls back to the first free slot.
        let fallback = m
            .seat_player(
                "d".into(),
                "d".into(),
                None,
                false,
                None,
                100,
                Some(4),
                false,
            )
            .unwrap();
        assert_eq!(fallback, 2);
    }

    #[test]
    fn table_fills_at_six() {
        let mut m = SeatManager::new();
        for i in 0..6 {
            seat(&mut m, &format!("u{i}"), 100);
        }
        assert!(!m.has_available_seat());
        let err = m
            .seat_player("u7".into(), "u7".into(), None, false, None, 100, None, false)
            .unwrap_err();
        assert_eq!(err, SeatError::TableFull);
    }

    #[test]
    fn double_seating_is_rejected() {
        let mut m = SeatManager::new();
        seat(&mut m, "a", 100);
        let err = m
            .seat_player("a".into(), "a".into(), None, false, None, 100, None, false)
            .unwrap_err();
        assert_eq!(err, SeatError::AlreadySeated);
    }

    #[test]
    fn seat_then_unseat_restores_the_slot_and_returns_chips() {
        let mut m = SeatManager::new();
        let s = seat(&mut m, "a", 250);
        let (user, chips) = m.unseat_player(s).unwrap();
        assert_eq!(user, "a");
        assert_eq!(chips, 250);
        assert!(m.get(s).is_none());
        assert_eq!(m.seated_count(), 0);
    }

    #[test]
    fn mid_hand_joiners_wait_for_the_next_deal() {
        let mut m = SeatManager::new();
        seat(&mut m, "a", 100);
        m.seat_player(
            "b".into(),
            "b".into(),
            None,
            false,
            None,
            100,
            None,
            true, // hand in progress
        )
        .unwrap();
        assert_eq!(m.playable_seats().len(), 1);
        m.clear_waiting_flags();
        assert_eq!(m.playable_seats().len(), 2);
    }

    #[test]
    fn fast_fold_leavers_keep_the_slot_but_stop_playing() {
        let mut m = SeatManager::new();
        let s = seat(&mut m, "a", 100);
        m.mark_left_for_fast_fold(s);
        let slot = m.get(s).unwrap();
        assert!(slot.left_for_fast_fold);
        assert!(!slot.can_play());
        assert_eq!(slot.chips, 0);
    }
}
