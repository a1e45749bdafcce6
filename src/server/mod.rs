pub mod bootstrap;
pub mod error;
pub mod logging;
pub mod routes;
pub mod ws;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::ServerConfig;
use crate::session::protocol::StatusPayload;
use crate::session::{SessionRegistry, TokenVerifier};
use crate::storage::Storage;
use crate::table::{MatchmakingPool, TableManager};

pub use bootstrap::run_server;

/// Shared server-wide state handed to routes and the session layer.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<dyn Storage>,
    pub manager: Arc<TableManager>,
    pub pool: Arc<MatchmakingPool>,
    pub sessions: Arc<SessionRegistry>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub maintenance: Arc<AtomicBool>,
    pub announcement: RwLock<Option<String>>,
}

impl AppState {
    pub fn maintenance_status(&self) -> StatusPayload {
        StatusPayload {
            active: self.maintenance.load(Ordering::Relaxed),
            message: None,
        }
    }

    pub fn announcement_status(&self) -> StatusPayload {
        let message = self.announcement.read().clone();
        StatusPayload {
            active: message.is_some(),
            message,
        }
    }
}
