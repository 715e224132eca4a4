//! # Promote Route
//!
//! `POST /v1/reservations/{id}/promote` — convert a hold into a pending or
//! confirmed booking, re-validating availability because time has passed
//! since the hold was placed.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::routes::{resolve_window, HoldItemDto, LineDto, LocalWindowDto};
use crate::state::AppState;
use marquee_core::{HoldLine, ReservationStatus};
use marquee_db::PromoteRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequestDto {
    /// `pending` or `confirmed`.
    pub target: ReservationStatus,

    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,

    /// Optional replacement items; requires `window` and supersedes the
    /// held lines entirely.
    pub items: Option<Vec<HoldItemDto>>,
    pub window: Option<LocalWindowDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub reservation_id: String,
    pub business_id: String,
    pub status: ReservationStatus,
    pub expires_at: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<LineDto>,
    pub created_at: String,
    pub updated_at: String,
}

/// Promotes a hold. Not-found maps to 404, an expired hold to 410, and a
/// lost re-validation to 409 — clients distinguish "start over" from
/// "sold out".
pub async fn promote_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<String>,
    Json(request): Json<PromoteRequestDto>,
) -> Result<Json<ReservationResponse>, ApiError> {
    debug!(reservation_id = %reservation_id, target = ?request.target, "promote_reservation");

    let lines = match (&request.items, &request.window) {
        (Some(items), Some(window_dto)) => {
            let reservation = state
                .db
                .reservations()
                .get_by_id(&reservation_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Reservation", &reservation_id))?;

            let window = resolve_window(&state, &reservation.business_id, window_dto).await?;
            Some(
                items
                    .iter()
                    .map(|item| HoldLine {
                        sku_id: item.sku_id.clone(),
                        quantity: item.quantity,
                        window,
                    })
                    .collect(),
            )
        }
        (Some(_), None) => {
            return Err(ApiError::validation(
                "replacement items require a window",
            ));
        }
        (None, _) => None,
    };

    let reservation = state
        .engine
        .promote(
            &reservation_id,
            PromoteRequest {
                target: request.target,
                customer_name: request.customer_name,
                customer_email: request.customer_email,
                customer_phone: request.customer_phone,
                notes: request.notes,
                lines,
            },
        )
        .await?;

    let items = state.db.reservations().get_lines(&reservation.id).await?;

    Ok(Json(ReservationResponse {
        reservation_id: reservation.id,
        business_id: reservation.business_id,
        status: reservation.status,
        expires_at: reservation.expires_at.map(|at| at.to_rfc3339()),
        customer_name: reservation.customer_name,
        customer_email: reservation.customer_email,
        customer_phone: reservation.customer_phone,
        notes: reservation.notes,
        items: items.into_iter().map(LineDto::from).collect(),
        created_at: reservation.created_at.to_rfc3339(),
        updated_at: reservation.updated_at.to_rfc3339(),
    }))
}
