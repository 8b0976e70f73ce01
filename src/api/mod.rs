// HTTP surface: screening, risk checks, sources, audit.

pub mod error;
pub mod handlers;

use crate::risk::RiskService;
use crate::screening::Screener;
use crate::storage::SqliteStorage;
use axum::Router;
use axum::routing::{get, post};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub screener: Arc<Screener>,
    pub risk: Arc<RiskService>,
    pub refresh_notify: Arc<Notify>,
    /// Root that file sources are resolved against.
    pub upload_dir: PathBuf,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/screen", post(handlers::screen))
        .route("/api/risk-check", post(handlers::risk_check))
        .route("/api/risk-confirm", post(handlers::risk_confirm))
        .route("/api/analyses/:consulta_id", get(handlers::get_analysis))
        .route("/api/audit/logs", get(handlers::audit_logs))
        .route(
            "/api/sources",
            get(handlers::list_sources).post(handlers::add_source),
        )
        .route("/api/sources/refresh", post(handlers::refresh_sources))
        .route("/api/sources/:id/facts", get(handlers::source_facts))
        .route("/api/sources/:id/insight", get(handlers::source_insight))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
