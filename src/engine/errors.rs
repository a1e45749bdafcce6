use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("not this seat's turn")]
    NotPlayersTurn,
    #[error("seat cannot act")]
    ActorCannotAct,
    #[error("action is not legal here")]
    IllegalAction,
    #[error("cannot check facing a bet")]
    CannotCheckFacingBet,
    #[error("cannot bet once the pot is opened")]
    CannotBetWhenOpened,
    #[error("raise is below the minimum")]
    RaiseBelowMinimum,
    #[error("raise exceeds the pot limit")]
    RaiseAbovePotLimit,
    #[error("raising is not reopened to this seat")]
    RaiseNotReopened,
    #[error("insufficient chips")]
    InsufficientChips,
    #[error("hand is already complete")]
    HandComplete,
    #[error("hand has not started")]
    HandNotStarted,
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid hand transition")]
    InvalidTransition,
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("not enough eligible players")]
    NotEnoughPlayers,
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub trait InvariantCheck {
    fn validate_invariants(&self) -> Result<(), StateError>;
}
