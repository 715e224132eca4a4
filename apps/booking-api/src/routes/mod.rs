//! # Route Module
//!
//! HTTP routes for the booking API, plus the DTO shapes shared between
//! them. Handlers stay thin: parse, normalize local time, delegate to the
//! engine, map the result.

pub mod availability;
pub mod hold;
pub mod promote;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use marquee_core::time;
use marquee_core::{ReservationLine, ReservationStatus, TimeWindow};

// =============================================================================
// Router
// =============================================================================

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/holds", post(hold::create_hold))
        .route("/v1/reservations/{id}/promote", post(promote::promote_reservation))
        .route("/v1/availability", get(availability::get_availability))
        .with_state(state)
}

// =============================================================================
// Shared DTOs
// =============================================================================

/// A business-local rental window as clients supply it: calendar date(s),
/// 24h wall-clock times, and an optional IANA zone. When the zone is
/// omitted the owning business's configured zone applies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalWindowDto {
    pub start_date: String,
    pub start_time: String,
    /// Defaults to `start_date`; set for overnight rentals.
    pub end_date: Option<String>,
    pub end_time: String,
    pub time_zone: Option<String>,
}

/// One requested item: a SKU and a quantity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldItemDto {
    pub sku_id: String,
    pub quantity: i64,
}

/// A reservation line in responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDto {
    pub sku_id: String,
    pub quantity: i64,
    pub start_utc: String,
    pub end_utc: String,
    pub status: ReservationStatus,
}

impl From<ReservationLine> for LineDto {
    fn from(line: ReservationLine) -> Self {
        LineDto {
            sku_id: line.sku_id,
            quantity: line.quantity,
            start_utc: line.start_utc.to_rfc3339(),
            end_utc: line.end_utc.to_rfc3339(),
            status: line.line_status,
        }
    }
}

// =============================================================================
// Window Resolution
// =============================================================================

/// Resolves a client-supplied local window into a UTC [`TimeWindow`],
/// falling back to the business's configured zone when none was sent.
pub async fn resolve_window(
    state: &AppState,
    business_id: &str,
    dto: &LocalWindowDto,
) -> Result<TimeWindow, ApiError> {
    let zone = match &dto.time_zone {
        Some(zone) => zone.clone(),
        None => state.db.businesses().get_time_zone(business_id).await?,
    };

    let start_date = time::parse_local_date(&dto.start_date)?;
    let start_time = time::parse_local_time(&dto.start_time)?;
    let end_date = dto
        .end_date
        .as_deref()
        .map(time::parse_local_date)
        .transpose()?;
    let end_time = time::parse_local_time(&dto.end_time)?;

    Ok(time::normalize_window(start_date, start_time, end_date, end_time, &zone)?)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    database: bool,
}

/// Liveness probe: process up, database answering.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}
