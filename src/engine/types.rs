use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::showdown::HandCategory;

pub type Chips = u64;
pub type SeatId = u8; // 0..=5
pub type UserId = String;

pub const MAX_SEATS: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    pub fn next(self) -> Street {
        match self {
            Street::Preflop => Street::Flop,
            Street::Flop => Street::Turn,
            Street::Turn => Street::River,
            Street::River | Street::Showdown => Street::Showdown,
        }
    }

    /// Number of community cards revealed entering this street.
    pub fn community_len(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River | Street::Showdown => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,     // can act this street
    Folded,     // out of hand
    AllIn,      // cannot act; still eligible for pots
    SittingOut, // not dealt in
}

/// One seat's snapshot inside a hand. Owned by the hand state; the table's
/// roster is reconciled from it when the hand completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandPlayer {
    pub seat: SeatId,
    pub user_id: UserId,
    pub name: String,
    pub is_bot: bool,

    pub stack: Chips,                // uncommitted chips behind
    pub committed_this_street: Chips,
    pub committed_total: Chips,      // prior streets

    pub hole_cards: Vec<Card>, // empty until dealt, then exactly 4
    pub status: PlayerStatus,
    pub has_acted_this_street: bool,
}

impl HandPlayer {
    pub fn new(seat: SeatId, user_id: UserId, name: String, is_bot: bool, stack: Chips) -> Self {
        Self {
            seat,
            user_id,
            name,
            is_bot,
            stack,
            committed_this_street: 0,
            committed_total: 0,
            hole_cards: Vec::new(),
            status: PlayerStatus::Active,
            has_acted_this_street: false,
        }
    }

    /// Chips this seat has put into the pot across all streets.
    pub fn total_committed(&self) -> Chips {
        self.committed_total + self.committed_this_street
    }

    pub fn is_in_hand(&self) -> bool {
        !matches!(self.status, PlayerStatus::Folded | PlayerStatus::SittingOut)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    pub amount: Chips,
    pub eligible: Vec<SeatId>, // seats that can win this pot
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pots {
    pub main: Pot,
    pub sides: Vec<Pot>,
}

impl Default for Pots {
    fn default() -> Self {
        Self {
            main: Pot {
                amount: 0,
                eligible: vec![],
            },
            sides: vec![],
        }
    }
}

impl Pots {
    pub fn total(&self) -> Chips {
        self.main.amount + self.sides.iter().map(|p| p.amount).sum::<Chips>()
    }

    /// Main pot first, then side pots in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Pot> {
        std::iter::once(&self.main).chain(self.sides.iter())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStakes {
    pub small_blind: Chips,
    pub big_blind: Chips,
}

impl TableStakes {
    pub fn label(&self) -> String {
        format!("{}/{}", self.small_blind, self.big_blind)
    }
}

/// Rake applied at resolution: `min(floor(pot * percent), cap_bb * big_blind)`.
/// No rake is taken from a preflop walkover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RakeConfig {
    pub percent: f64,
    pub cap_bb: Chips,
}

impl Default for RakeConfig {
    fn default() -> Self {
        Self {
            percent: 0.05,
            cap_bb: 1,
        }
    }
}

impl RakeConfig {
    pub const NONE: RakeConfig = RakeConfig {
        percent: 0.0,
        cap_bb: 0,
    };

    pub fn rake_for(&self, pot: Chips, big_blind: Chips) -> Chips {
        let pct = (pot as f64 * self.percent).floor() as Chips;
        pct.min(self.cap_bb * big_blind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub seat: SeatId,
    pub amount: Chips,
    pub category: Option<HandCategory>,
}

/// What a seat actually did, after the engine normalized the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NormalizedAction {
    PostSmallBlind { amount: Chips },
    PostBigBlind { amount: Chips },
    Fold,
    Check,
    Call { amount: Chips, all_in: bool },
    Bet { to: Chips, all_in: bool },
    Raise { to: Chips, full: bool, all_in: bool },
}

impl NormalizedAction {
    /// Wire-facing action name; blind posts are not broadcast as actions.
    pub fn kind(&self) -> Option<ActionKind> {
        match self {
            NormalizedAction::PostSmallBlind { .. } | NormalizedAction::PostBigBlind { .. } => None,
            NormalizedAction::Fold => Some(ActionKind::Fold),
            NormalizedAction::Check => Some(ActionKind::Check),
            NormalizedAction::Call { all_in: true, .. }
            | NormalizedAction::Bet { all_in: true, .. }
            | NormalizedAction::Raise { all_in: true, .. } => Some(ActionKind::AllIn),
            NormalizedAction::Call { .. } => Some(ActionKind::Call),
            NormalizedAction::Bet { .. } => Some(ActionKind::Bet),
            NormalizedAction::Raise { .. } => Some(ActionKind::Raise),
        }
    }

    pub fn amount(&self) -> Chips {
        match *self {
            NormalizedAction::PostSmallBlind { amount } | NormalizedAction::PostBigBlind { amount } => amount,
            NormalizedAction::Fold | NormalizedAction::Check => 0,
            NormalizedAction::Call { amount, .. } => amount,
            NormalizedAction::Bet { to, .. } => to,
            NormalizedAction::Raise { to, .. } => to,
        }
    }

    pub fn is_aggressive(&self) -> bool {
        matches!(
            self,
            NormalizedAction::Bet { .. } | NormalizedAction::Raise { .. }
        )
    }

    pub fn is_voluntary(&self) -> bool {
        !matches!(
            self,
            NormalizedAction::PostSmallBlind { .. } | NormalizedAction::PostBigBlind { .. }
        )
    }
}

/// The action vocabulary shared with clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

/// One entry of the ordered hand history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedAction {
    pub street: Street,
    pub seat: SeatId,
    pub action: NormalizedAction,
}
