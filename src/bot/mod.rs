//! The reference opponent: a pure decision function over what a seated
//! client can observe. Transport is not here; a bot connects over the same
//! wire protocol as any client and feeds `game:state` + `game:action_required`
//! into [`strategy::decide`].

pub mod strategy;

use crate::cards::Card;
use crate::engine::types::{ActionKind, Chips};
use crate::engine::ValidAction;

/// What the bot can see when prompted to act.
#[derive(Clone, Debug)]
pub struct BotView {
    pub hole_cards: [Card; 4],
    pub community: Vec<Card>,
    pub pot: Chips,
    pub to_call: Chips,
    pub stack: Chips,
    pub big_blind: Chips,
    /// Live opponents still contesting the hand.
    pub opponents: usize,
    /// Acting after most of the field this street.
    pub in_position: bool,
    pub valid_actions: Vec<ValidAction>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BotDecision {
    pub action: ActionKind,
    pub amount: Option<Chips>,
}

impl BotDecision {
    fn of(action: ActionKind) -> Self {
        Self {
            action,
            amount: None,
        }
    }

    fn sized(action: ActionKind, amount: Chips) -> Self {
        Self {
            action,
            amount: Some(amount),
        }
    }
}

pub use strategy::decide;
