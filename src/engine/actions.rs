use serde::{Deserialize, Serialize};

use super::types::{ActionKind, Chips, SeatId};

/// A seat's requested action before the engine normalizes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    /// First voluntary wager of a street; `to` is the street total.
    Bet { to: Chips },
    /// `to` is the street total, not the increment.
    Raise { to: Chips },
    /// Engine normalizes to bet/raise/call at the seat's full stack.
    AllIn,
}

impl PlayerAction {
    /// Build from the wire pair (action kind, optional amount).
    pub fn from_wire(kind: ActionKind, amount: Option<Chips>) -> Option<Self> {
        match kind {
            ActionKind::Fold => Some(PlayerAction::Fold),
            ActionKind::Check => Some(PlayerAction::Check),
            ActionKind::Call => Some(PlayerAction::Call),
            ActionKind::Bet => amount.map(|to| PlayerAction::Bet { to }),
            ActionKind::Raise => amount.map(|to| PlayerAction::Raise { to }),
            ActionKind::AllIn => Some(PlayerAction::AllIn),
        }
    }
}

/// Commands accepted by the command processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    StartHand,
    PlayerAction { seat: SeatId, action: PlayerAction },
    /// Server-originated decision deadline; becomes check if legal, else fold.
    Timeout { seat: SeatId },
}
