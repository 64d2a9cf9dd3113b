//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;
use crate::errors::IndexerError;
use crate::events::{EventKind, EventRecord};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

/// All routes served by the indexer.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(get_all_events))
        .route("/withdrawals", get(get_withdrawals))
        .route("/funders/:address/events", get(get_funder_events))
        .route("/funders/:address/balance", get(get_funder_balance))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct FunderEventsResponse {
    pub address: String,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    /// Decimal string; native amounts are i128.
    pub balance: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for IndexerError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, IndexerError>;

/// Accept account (`G…`) and contract (`C…`) strkeys: 56 base32 characters.
fn validate_address(address: &str) -> Result<(), IndexerError> {
    let well_formed = address.len() == 56
        && matches!(address.as_bytes()[0], b'G' | b'C')
        && address
            .bytes()
            .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b));
    if well_formed {
        Ok(())
    } else {
        Err(IndexerError::InvalidAddress(address.to_string()))
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /events`
///
/// Returns every indexed event.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> ApiResult<EventsResponse> {
    let events = db::get_all_events(&state.pool).await?;
    Ok(Json(EventsResponse {
        count: events.len(),
        events,
    }))
}

/// `GET /withdrawals`
pub async fn get_withdrawals(State(state): State<Arc<ApiState>>) -> ApiResult<EventsResponse> {
    let events = db::get_events_by_kind(&state.pool, &EventKind::Withdrawn).await?;
    Ok(Json(EventsResponse {
        count: events.len(),
        events,
    }))
}

/// `GET /funders/:address/events`
///
/// Returns every event whose actor is `address`.
pub async fn get_funder_events(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<FunderEventsResponse> {
    validate_address(&address)?;
    let events = db::get_events_for_actor(&state.pool, &address).await?;
    Ok(Json(FunderEventsResponse {
        address,
        count: events.len(),
        events,
    }))
}

/// `GET /funders/:address/balance`
///
/// Amount `address` has contributed since the last withdrawal.
pub async fn get_funder_balance(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<BalanceResponse> {
    validate_address(&address)?;
    let balance = db::get_outstanding_balance(&state.pool, &address).await?;
    Ok(Json(BalanceResponse {
        address,
        balance: balance.to_string(),
    }))
}
