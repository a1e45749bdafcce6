use super::errors::{InvariantCheck, StateError};
use super::types::{
    Chips, HandPlayer, LoggedAction, PlayerStatus, Pots, SeatId, Street, TableStakes, Winner,
};
use crate::cards::{Card, Deck};

/// The complete state of one hand. A value type: the engine never mutates a
/// caller's state, it clones and returns.
#[derive(Clone, Debug)]
pub struct HandState {
    pub hand_no: u64,

    // Street and turn order:
    pub street: Street,
    pub button: SeatId,
    pub sb_seat: SeatId,
    pub bb_seat: SeatId,
    pub to_act: Option<SeatId>,

    // Open/raise accounting:
    pub current_bet: Chips,       // highest committed_this_street among live seats
    pub last_full_raise: Chips,   // minimum raise increment for this street
    pub last_aggressor: Option<SeatId>,
    pub voluntary_bet_opened: bool,

    // Players, cards & pots:
    pub players: Vec<HandPlayer>, // ordered by seat
    pub deck: Deck,
    pub community: Vec<Card>,
    pub pots: Pots,

    pub stakes: TableStakes,

    // Deterministic log and terminal data:
    pub action_log: Vec<LoggedAction>,
    pub started: bool,
    pub is_complete: bool,
    pub winners: Vec<Winner>,
    pub rake: Chips,

    /// Chip total at deal time, used by the invariant check.
    pub initial_chip_total: Chips,
}

impl HandState {
    /// A not-yet-started hand over the given roster. `players` must be
    /// seat-ordered; blinds and cards are posted by `start_hand`.
    pub fn new(
        hand_no: u64,
        players: Vec<HandPlayer>,
        stakes: TableStakes,
        button: SeatId,
        deck: Deck,
    ) -> Self {
        let initial_chip_total = players.iter().map(|p| p.stack).sum();
        Self {
            hand_no,
            street: Street::Preflop,
            button,
            sb_seat: button,
            bb_seat: button,
            to_act: None,
            current_bet: 0,
            last_full_raise: 0,
            last_aggressor: None,
            voluntary_bet_opened: false,
            players,
            deck,
            community: Vec::new(),
            pots: Pots::default(),
            stakes,
            action_log: Vec::new(),
            started: false,
            is_complete: false,
            winners: Vec::new(),
            rake: 0,
            initial_chip_total,
        }
    }

    pub fn player(&self, seat: SeatId) -> Option<&HandPlayer> {
        self.players.iter().find(|p| p.seat == seat)
    }

    pub fn player_mut(&mut self, seat: SeatId) -> Option<&mut HandPlayer> {
        self.players.iter_mut().find(|p| p.seat == seat)
    }

    /// Seats still contesting the hand (not folded, not sitting out).
    pub fn seats_in_hand(&self) -> Vec<SeatId> {
        self.players
            .iter()
            .filter(|p| p.is_in_hand())
            .map(|p| p.seat)
            .collect()
    }

    /// Seats that can still take an action this street.
    pub fn active_seats(&self) -> Vec<SeatId> {
        self.players
            .iter()
            .filter(|p| p.status == PlayerStatus::Active)
            .map(|p| p.seat)
            .collect()
    }

    /// Minimum street total for the next raise.
    pub fn min_raise_to(&self) -> Chips {
        self.current_bet + self.last_full_raise
    }

    /// All chips committed to the hand so far, including the current street.
    pub fn pot_size(&self) -> Chips {
        self.players.iter().map(|p| p.total_committed()).sum()
    }

    /// Whether the current betting street has been closed by action.
    pub fn street_is_closed(&self) -> bool {
        self.players
            .iter()
            .filter(|p| p.status == PlayerStatus::Active)
            .all(|p| p.has_acted_this_street && p.committed_this_street == self.current_bet)
    }

    /// Moves street-level counters into the new street. Community cards and
    /// turn order are handled by the dealing layer.
    pub fn reset_for_street(&mut self, street: Street) {
        for p in &mut self.players {
            p.committed_total += p.committed_this_street;
            p.committed_this_street = 0;
            if p.status == PlayerStatus::Active {
                p.has_acted_this_street = false;
            }
        }
        self.street = street;
        self.current_bet = 0;
        self.last_full_raise = self.stakes.big_blind;
        self.last_aggressor = None;
        self.voluntary_bet_opened = false;
    }
}

impl InvariantCheck for HandState {
    fn validate_invariants(&self) -> Result<(), StateError> {
        // Chip conservation: stacks plus committed chips equal the deal-time
        // total until winnings are distributed.
        if !self.is_complete {
            let total: Chips = self
                .players
                .iter()
                .map(|p| p.stack + p.total_committed())
                .sum();
            if total != self.initial_chip_total {
                return Err(StateError::InvariantViolation("chip conservation"));
            }
        }

        // Folded seats must not appear in eligibility sets.
        for pot in self.pots.iter() {
            for sid in &pot.eligible {
                let folded = self
                    .player(*sid)
                    .map(|p| p.status == PlayerStatus::Folded)
                    .unwrap_or(true);
                if folded {
                    return Err(StateError::InvariantViolation(
                        "folded seat in pot eligibility",
                    ));
                }
            }
        }

        // Pot totals must account for every committed chip.
        let committed: Chips = self.players.iter().map(|p| p.total_committed()).sum();
        if self.pots.total() > committed {
            return Err(StateError::InvariantViolation("pot exceeds commitments"));
        }

        Ok(())
    }
}
