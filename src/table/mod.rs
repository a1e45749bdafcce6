pub mod broadcast;
pub mod controller;
pub mod instance;
pub mod manager;
pub mod matchmaking;
pub mod seats;

pub use broadcast::Room;
pub use controller::{ActionController, TimerKey};
pub use instance::{Table, TableConfig, TableHandle, TableId, TableInfo, TableMsg, TablePhase};
pub use manager::{ManagerMsg, TableManager};
pub use matchmaking::{JoinError, MatchmakingPool, QueueStatus};
pub use seats::{SeatError, SeatManager, SeatSlot};
