use super::state::HandState;
use super::types::{PlayerStatus, SeatId, Street, MAX_SEATS};

/// Clockwise seat rotation over the six fixed seats, restricted to seats
/// present in the hand.
impl HandState {
    /// Next seat after `from` satisfying `pred`, walking clockwise. Returns
    /// `None` when no other seat qualifies.
    pub fn next_seat_where<F>(&self, from: SeatId, pred: F) -> Option<SeatId>
    where
        F: Fn(&super::types::HandPlayer) -> bool,
    {
        let n = MAX_SEATS as u8;
        let mut seat = from;
        for _ in 0..n {
            seat = (seat + 1) % n;
            if let Some(p) = self.player(seat) {
                if pred(p) {
                    return Some(seat);
                }
            }
        }
        None
    }

    /// Next seat that can still act this street.
    pub fn next_actor(&self, from: SeatId) -> Option<SeatId> {
        self.next_seat_where(from, |p| p.status == PlayerStatus::Active)
    }

    /// First seat to act when `street` opens: left of the big blind preflop,
    /// left of the button after the flop.
    pub fn first_to_act(&self, street: Street) -> Option<SeatId> {
        match street {
            Street::Preflop => self.next_actor(self.bb_seat),
            _ => self.next_actor(self.button),
        }
    }

    /// Seats in clockwise order starting left of the button. Used for odd-chip
    /// awards: "earliest position" is the first eligible seat in this order.
    pub fn seats_by_position(&self) -> Vec<SeatId> {
        let n = MAX_SEATS as u8;
        let mut out = Vec::with_capacity(self.players.len());
        let mut seat = self.button;
        for _ in 0..n {
            seat = (seat + 1) % n;
            if self.player(seat).is_some() {
                out.push(seat);
            }
        }
        out
    }
}

/// Next occupied seat after `prev_button` among `occupied` (seat-ordered).
/// This is how the dealer button advances between hands.
pub fn next_button(occupied: &[SeatId], prev_button: Option<SeatId>) -> Option<SeatId> {
    if occupied.is_empty() {
        return None;
    }
    let prev = match prev_button {
        Some(b) => b,
        None => return Some(occupied[0]),
    };
    let n = MAX_SEATS as u8;
    let mut seat = prev;
    for _ in 0..n {
        seat = (seat + 1) % n;
        if occupied.contains(&seat) {
            return Some(seat);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_walks_to_next_occupied_seat() {
        let occupied = vec![0, 2, 5];
        assert_eq!(next_button(&occupied, None), Some(0));
        assert_eq!(next_button(&occupied, Some(0)), Some(2));
        assert_eq!(next_button(&occupied, Some(2)), Some(5));
        assert_eq!(next_button(&occupied, Some(5)), Some(0));
        // A button on a now-empty seat still finds the next occupied one.
        assert_eq!(next_button(&occupied, Some(3)), Some(5));
    }

    #[test]
    fn empty_roster_has_no_button() {
        assert_eq!(next_button(&[], Some(1)), None);
    }
}
