pub mod actions;
pub mod dealing;
pub mod engine;
pub mod errors;
pub mod events;
pub mod legals;
pub mod processor;
pub mod rules;
pub mod seating;
pub mod state;
pub mod types;

pub use actions::{Command, PlayerAction};
pub use engine::{
    apply_action, determine_winner, fold_out_of_turn, start_hand, would_advance_street,
};
pub use errors::{ActionError, InvariantCheck, StateError};
pub use events::HandEvent;
pub use legals::{valid_actions, ValidAction};
pub use processor::{process_command, process_early_fold, CommandOutcome};
pub use seating::next_button;
pub use state::HandState;
pub use types::*;
