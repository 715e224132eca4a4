//! # Hold Route
//!
//! `POST /v1/holds` — place a time-limited hold on inventory.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::routes::{resolve_window, HoldItemDto, LineDto, LocalWindowDto};
use crate::state::AppState;
use marquee_core::{HoldLine, ReservationStatus};
use marquee_db::HoldRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoldRequest {
    pub business_id: String,

    /// Optional client-minted id; resend it to retry the same logical
    /// request idempotently.
    pub reservation_id: Option<String>,

    /// The rental window, shared by every requested item.
    pub window: LocalWindowDto,

    pub items: Vec<HoldItemDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoldResponse {
    pub reservation_id: String,
    pub status: ReservationStatus,
    /// When the hold lapses unless promoted (RFC 3339).
    pub expires_at: Option<String>,
    pub items: Vec<LineDto>,
}

/// Places a hold: normalizes the local window, then hands the decision to
/// the reservation engine. A conflict surfaces as HTTP 409.
pub async fn create_hold(
    State(state): State<AppState>,
    Json(request): Json<CreateHoldRequest>,
) -> Result<(StatusCode, Json<CreateHoldResponse>), ApiError> {
    debug!(business_id = %request.business_id, items = request.items.len(), "create_hold");

    let window = resolve_window(&state, &request.business_id, &request.window).await?;

    let lines: Vec<HoldLine> = request
        .items
        .iter()
        .map(|item| HoldLine {
            sku_id: item.sku_id.clone(),
            quantity: item.quantity,
            window,
        })
        .collect();

    let reservation = state
        .engine
        .place_hold(HoldRequest {
            business_id: request.business_id,
            reservation_id: request.reservation_id,
            lines,
        })
        .await?;

    let items = state.db.reservations().get_lines(&reservation.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateHoldResponse {
            reservation_id: reservation.id,
            status: reservation.status,
            expires_at: reservation.expires_at.map(|at| at.to_rfc3339()),
            items: items.into_iter().map(LineDto::from).collect(),
        }),
    ))
}
