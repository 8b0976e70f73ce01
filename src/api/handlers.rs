use crate::api::AppState;
use crate::api::error::ApiError;
use crate::insight::{SourceInsight, analyze_file};
use crate::matcher::MatchMode;
use crate::model::{
    AuditEntry, Fact, IdentifierType, InfoSource, NewInfoSource, ScreeningQuery, SourceOrigin,
};
use crate::risk::{Analysis, RiskCheckOutcome, RiskCheckRequest, RiskConfirmRequest};
use crate::screening::ScreeningReport;
use crate::utils::current_year;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct ScreenRequest {
    pub identifier: String,
    #[serde(default)]
    pub identifier_type: Option<String>,
    #[serde(default)]
    pub mode: Option<MatchMode>,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /api/screen
pub async fn screen(
    State(state): State<AppState>,
    payload: Result<Json<ScreenRequest>, JsonRejection>,
) -> Result<Json<ScreeningReport>, ApiError> {
    let Json(request) = payload?;
    let identifier_type = match request.identifier_type.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<IdentifierType>()?,
        _ => IdentifierType::default(),
    };
    let query = ScreeningQuery {
        identifier: request.identifier,
        identifier_type,
    };
    let report = state.screener.screen(&query, request.mode).await?;
    Ok(Json(report))
}

/// POST /api/risk-check
pub async fn risk_check(
    State(state): State<AppState>,
    payload: Result<Json<RiskCheckRequest>, JsonRejection>,
) -> Result<Json<RiskCheckOutcome>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.risk.check(&request).await?))
}

/// POST /api/risk-confirm
pub async fn risk_confirm(
    State(state): State<AppState>,
    payload: Result<Json<RiskConfirmRequest>, JsonRejection>,
) -> Result<Json<Analysis>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.risk.confirm(&request).await?))
}

/// GET /api/analyses/:consulta_id
pub async fn get_analysis(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Analysis>, ApiError> {
    let Path(consulta_id) = path?;
    state
        .storage
        .lock()
        .await
        .get_analysis(&consulta_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("analysis {} not found", consulta_id)))
}

/// GET /api/audit/logs?limit=
pub async fn audit_logs(
    State(state): State<AppState>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    Ok(Json(state.storage.lock().await.list_audit(limit)?))
}

pub async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<InfoSource>>, ApiError> {
    Ok(Json(state.storage.lock().await.list_sources()?))
}

pub async fn add_source(
    State(state): State<AppState>,
    payload: Result<Json<NewInfoSource>, JsonRejection>,
) -> Result<(StatusCode, Json<InfoSource>), ApiError> {
    let Json(new_source) = payload?;
    let source = state
        .storage
        .lock()
        .await
        .add_source(&new_source, &state.upload_dir)?;
    info!("Registered source {} '{}' ({})", source.id, source.title, source.origin);
    Ok((StatusCode::CREATED, Json(source)))
}

async fn find_source(state: &AppState, id: i64) -> Result<InfoSource, ApiError> {
    state
        .storage
        .lock()
        .await
        .get_source(id)?
        .ok_or_else(|| ApiError::NotFound(format!("source {} not found", id)))
}

/// GET /api/sources/:id/facts: facts cached by the last successful scan.
pub async fn source_facts(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Fact>>, ApiError> {
    let Path(id) = path?;
    let source = find_source(&state, id).await?;
    Ok(Json(state.storage.lock().await.cached_facts(source.id)?))
}

/// GET /api/sources/:id/insight
pub async fn source_insight(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SourceInsight>, ApiError> {
    let Path(id) = path?;
    let source = find_source(&state, id).await?;
    match &source.origin {
        SourceOrigin::File(path) => Ok(Json(analyze_file(path, current_year()).await)),
        SourceOrigin::Url(_) => Err(ApiError::BadRequest(format!(
            "source {} is a url; insight needs an uploaded file",
            id
        ))),
    }
}

/// POST /api/sources/refresh: wakes the background refresher.
pub async fn refresh_sources(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    state.refresh_notify.notify_one();
    (StatusCode::ACCEPTED, Json(json!({ "status": "scheduled" })))
}
