//! # Availability Route
//!
//! `GET /v1/availability` — the advisory read used to filter sellable
//! inventory before a hold is attempted. The answer can go stale the
//! moment a concurrent writer commits; the hold itself re-validates inside
//! the reservation transaction.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::routes::{resolve_window, LocalWindowDto};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub business_id: String,
    pub sku_id: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: Option<String>,
    pub end_time: String,
    pub time_zone: Option<String>,

    /// Lets a client re-check a window against everything except its own
    /// hold (e.g. before extending it).
    pub exclude_reservation_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub sku_id: String,
    pub start_utc: String,
    pub end_utc: String,
    pub available_units: i64,
}

/// Computes free units for a SKU over a local window.
pub async fn get_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    debug!(sku_id = %query.sku_id, "get_availability");

    let window_dto = LocalWindowDto {
        start_date: query.start_date,
        start_time: query.start_time,
        end_date: query.end_date,
        end_time: query.end_time,
        time_zone: query.time_zone,
    };
    let window = resolve_window(&state, &query.business_id, &window_dto).await?;

    let available_units = state
        .engine
        .availability(
            &query.sku_id,
            &window,
            query.exclude_reservation_id.as_deref(),
        )
        .await?;

    Ok(Json(AvailabilityResponse {
        sku_id: query.sku_id,
        start_utc: window.start.to_rfc3339(),
        end_utc: window.end.to_rfc3339(),
        available_units,
    }))
}
