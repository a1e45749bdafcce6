use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use super::error::ApiError;
use super::ws::ws_handler;
use super::AppState;
use crate::session::protocol::WireMessage;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = match state.config.client_origin.as_str() {
        "*" => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        origin => {
            let parsed = origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("*"));
            CorsLayer::new()
                .allow_origin(parsed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .route("/admin/tables", get(admin_tables))
        .route("/admin/maintenance", post(admin_maintenance))
        .route("/admin/announcement", post(admin_announcement))
        .layer(Extension(state))
        .layer(middleware::from_fn(super::logging::log_requests))
        .layer(cors)
}

async fn healthz(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.sessions.len(),
        "maintenance": state.maintenance.load(Ordering::Relaxed),
    }))
}

async fn admin_tables(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tables = state.manager.tables_info().await;
    let queues = state.pool.status();
    Ok(Json(json!({ "tables": tables, "queues": queues })))
}

#[derive(Debug, Deserialize)]
struct MaintenanceRequest {
    enabled: bool,
}

async fn admin_maintenance(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<MaintenanceRequest>,
) -> Json<serde_json::Value> {
    state
        .maintenance
        .store(request.enabled, Ordering::Relaxed);
    tracing::info!(
        target: "server::admin",
        enabled = request.enabled,
        "maintenance switched"
    );
    state.sessions.broadcast(&WireMessage::new(
        "maintenance:status",
        state.maintenance_status(),
    ));
    Json(json!({ "maintenance": request.enabled }))
}

#[derive(Debug, Deserialize)]
struct AnnouncementRequest {
    message: Option<String>,
}

async fn admin_announcement(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<AnnouncementRequest>,
) -> Json<serde_json::Value> {
    *state.announcement.write() = request.message.clone();
    state.sessions.broadcast(&WireMessage::new(
        "announcement:status",
        state.announcement_status(),
    ));
    Json(json!({ "announcement": request.message }))
}
