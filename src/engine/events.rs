use serde::{Deserialize, Serialize};

use super::types::{ActionKind, Chips, SeatId, Street, Winner};
use crate::cards::Card;

/// Events produced by the command processor, in the order they occurred.
///
/// For any single command the sequence is a prefix of
/// `[HAND_STARTED | ACTION_APPLIED, (STREET_ADVANCED | ALL_IN_RUNOUT)?,
///   SHOWDOWN_REACHED?, HAND_COMPLETED?]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum HandEvent {
    HandStarted {
        dealer_seat: SeatId,
        hole_cards: Vec<(SeatId, Vec<Card>)>,
    },
    ActionApplied {
        seat: SeatId,
        action: ActionKind,
        amount: Chips,
    },
    StreetAdvanced {
        street: Street,
        new_cards: Vec<Card>,
    },
    AllInRunout {
        community_cards: Vec<Card>,
    },
    ShowdownReached,
    HandCompleted {
        winners: Vec<Winner>,
        rake: Chips,
    },
}
