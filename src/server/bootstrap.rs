use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tracing::info;

use super::routes::build_router;
use super::AppState;
use crate::config::ServerConfig;
use crate::session::{DevTokenVerifier, SessionRegistry, TokenVerifier};
use crate::storage::{MemoryStore, Storage};
use crate::table::{MatchmakingPool, TableManager};

const LOG_TARGET: &str = "server::bootstrap";

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);

    // The SQL-backed store is an external collaborator; until one is wired
    // in, persistence-enabled deployments still run on the in-process store.
    if config.persistence_enabled {
        tracing::warn!(
            target: LOG_TARGET,
            store_url = ?config.store_url,
            "persistence requested; using the in-process store"
        );
    }
    let storage: Arc<dyn Storage> = Arc::new(MemoryStore::new(config.starting_bankroll));
    let verifier: Arc<dyn TokenVerifier> = Arc::new(DevTokenVerifier);

    let maintenance = Arc::new(AtomicBool::new(config.maintenance));
    let manager = TableManager::new(
        Arc::clone(&config),
        Arc::clone(&storage),
        Arc::clone(&maintenance),
    );
    let pool = MatchmakingPool::new(
        Arc::clone(&config),
        Arc::clone(&manager),
        Arc::clone(&storage),
        Arc::clone(&maintenance),
    );

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        storage,
        manager,
        pool,
        sessions: Arc::new(SessionRegistry::new()),
        verifier,
        maintenance,
        announcement: RwLock::new(None),
    });

    let router = build_router(state);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(
        target: LOG_TARGET,
        %local_addr,
        blinds = %config.default_blinds,
        "plo poker server listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    use tracing::warn;

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target: LOG_TARGET,
            error = %err,
            "failed to install ctrl-c handler"
        );
    }
    info!(target: LOG_TARGET, "shutdown signal received");
}
