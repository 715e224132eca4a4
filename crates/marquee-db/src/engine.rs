//! # Reservation Engine
//!
//! The reservation transaction: the only place reservation rows are
//! written, and the component that turns "is this free?" into an atomic
//! commitment.
//!
//! ## Operation Shape
//! ```text
//! place_hold()                          promote()
//!      │                                    │
//!      ▼                                    ▼
//! validate at the boundary            validate at the boundary
//!      │ (no transaction yet)              │
//!      ▼                                    ▼
//! ┌─ attempt (≤ 3×) ────────────┐     ┌─ attempt (≤ 3×) ────────────┐
//! │ BEGIN                       │     │ BEGIN                       │
//! │ replay check (idempotency)  │     │ load + eligibility check    │
//! │ load business buffers       │     │ load business buffers       │
//! │ insert reservation (HOLD)   │     │ re-check every line against │
//! │ per line, in sku order:     │     │   fresh state, excluding    │
//! │   re-check availability     │     │   the reservation itself    │
//! │   insert line               │     │ flip status, clear expiry   │
//! │ COMMIT                      │     │ COMMIT                      │
//! └─────────────────────────────┘     └─────────────────────────────┘
//!      │                                    │
//!      ▼                                    ▼
//! classify failure: Conflict → done; Transient → backoff, retry;
//! Fatal → done
//! ```
//!
//! ## Isolation
//! SQLite WAL gives each transaction a snapshot at first read and allows a
//! single writer. A transaction whose snapshot went stale before it reached
//! the write lock dies with a busy error instead of committing — so a
//! committed reservation is always the product of a check that saw every
//! earlier commit. That is the no-oversell guarantee; the retry loop merely
//! smooths over the busy errors it produces.

use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, Transaction};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{classify, DbError, FailureClass};
use crate::pool::Database;
use crate::repository::{business, inventory, reservation};
use marquee_core::availability::{self, LineSnapshot};
use marquee_core::validation::{validate_hold_lines, validate_id};
use marquee_core::{
    promotion_eligibility, HoldLine, PromotionEligibility, Reservation, ReservationLine,
    ReservationStatus, TimeWindow, ValidationError, HOLD_TTL_MINUTES,
};

// =============================================================================
// Engine Error
// =============================================================================

/// The caller-facing error taxonomy of the reservation engine.
///
/// Every database-layer error is classified into one of these kinds before
/// leaving this module; callers never see raw sqlx errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed request, rejected before any transaction was opened.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough free units, whether detected on the first attempt or
    /// after retries. Terminal: the requested window is taken.
    #[error("Not enough units of {sku_id} available: requested {requested}, available {available}")]
    Conflict {
        sku_id: String,
        requested: i64,
        available: i64,
    },

    /// Reservation does not exist.
    #[error("Reservation not found: {0}")]
    NotFound(String),

    /// The hold lapsed before promotion; the hold flow must restart.
    #[error("Reservation {0} has expired")]
    Expired(String),

    /// The reservation is in a terminal state and can never be promoted.
    #[error("Reservation {id} is {status:?} and cannot be promoted")]
    NotPromotable {
        id: String,
        status: ReservationStatus,
    },

    /// Business collaborator record missing.
    #[error("Business not found: {0}")]
    BusinessNotFound(String),

    /// SKU missing, inactive, or belonging to another business.
    #[error("SKU not found or not sellable: {0}")]
    SkuNotFound(String),

    /// Infrastructure failure that survived the retry budget. Distinct
    /// from [`EngineError::Conflict`] so clients can say "try again"
    /// instead of "sold out".
    #[error("Temporary failure, please try again: {0}")]
    Transient(String),

    /// Fatal database error; not retried.
    #[error("Internal error: {0}")]
    Internal(#[from] DbError),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Requests
// =============================================================================

/// A request to place a hold on inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldRequest {
    pub business_id: String,

    /// Client-supplied reservation id for idempotent retries. When `None`,
    /// the engine mints a UUID before the first attempt so every attempt
    /// of one logical request shares the same id.
    pub reservation_id: Option<String>,

    pub lines: Vec<HoldLine>,
}

/// A request to promote a hold into a pending/confirmed booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoteRequest {
    /// Target status: `Pending` or `Confirmed` only.
    pub target: ReservationStatus,

    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,

    /// When present, replaces the hold's line set (re-validated like a
    /// fresh hold). When absent, the existing lines are re-validated as-is.
    pub lines: Option<Vec<HoldLine>>,
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Tunables for the reservation transaction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hold lifetime in minutes.
    pub hold_ttl_minutes: i64,

    /// Maximum transaction attempts per operation.
    pub max_attempts: u32,

    /// Base backoff between attempts; the delay is
    /// `backoff_base × attempt + jitter`.
    pub backoff_base: std::time::Duration,

    /// Upper bound of the random jitter added to each backoff.
    pub backoff_jitter: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hold_ttl_minutes: HOLD_TTL_MINUTES,
            max_attempts: 3,
            backoff_base: std::time::Duration::from_millis(50),
            backoff_jitter: std::time::Duration::from_millis(25),
        }
    }
}

// =============================================================================
// Attempt Outcome
// =============================================================================

/// Outcome of one transaction attempt, classified immediately so the retry
/// loop is a plain match instead of exception plumbing.
#[derive(Debug)]
enum AttemptError {
    /// Availability re-check failed: a real conflict, never retried.
    Conflict {
        sku_id: String,
        requested: i64,
        available: i64,
    },
    /// A terminal domain outcome (not found, expired, ...), never retried.
    Halt(EngineError),
    /// A database error; `classify` decides Transient vs Fatal.
    Db(DbError),
}

impl From<DbError> for AttemptError {
    fn from(err: DbError) -> Self {
        AttemptError::Db(err)
    }
}

impl From<sqlx::Error> for AttemptError {
    fn from(err: sqlx::Error) -> Self {
        AttemptError::Db(DbError::from(err))
    }
}

// =============================================================================
// Reservation Engine
// =============================================================================

/// The reservation engine: holds, promotions, advisory availability, and
/// the stale-hold janitor.
#[derive(Debug, Clone)]
pub struct ReservationEngine {
    db: Database,
    config: EngineConfig,
}

impl ReservationEngine {
    /// Creates an engine with default tunables.
    pub fn new(db: Database) -> Self {
        ReservationEngine {
            db,
            config: EngineConfig::default(),
        }
    }

    /// Creates an engine with explicit tunables.
    pub fn with_config(db: Database, config: EngineConfig) -> Self {
        ReservationEngine { db, config }
    }

    // -------------------------------------------------------------------------
    // place_hold
    // -------------------------------------------------------------------------

    /// Places a time-limited hold on the requested lines.
    ///
    /// Validation happens before any transaction: a rejected request leaves
    /// no row behind. The reservation id is fixed before the retry loop, so
    /// client retries of the same logical request are idempotent — replaying
    /// an id that already committed returns the stored reservation.
    pub async fn place_hold(&self, request: HoldRequest) -> EngineResult<Reservation> {
        validate_id("business_id", &request.business_id)?;
        validate_hold_lines(&request.lines)?;

        let reservation_id = match &request.reservation_id {
            Some(id) => {
                validate_id("reservation_id", id)?;
                id.clone()
            }
            None => Uuid::new_v4().to_string(),
        };

        // Stable order reduces writer collisions between requests touching
        // the same SKUs.
        let mut lines = request.lines.clone();
        lines.sort_by(|a, b| {
            (a.sku_id.as_str(), a.window.start).cmp(&(b.sku_id.as_str(), b.window.start))
        });

        let mut attempt = 1u32;
        loop {
            match self.try_place_hold(&reservation_id, &request, &lines).await {
                Ok(reservation) => {
                    info!(
                        reservation_id = %reservation.id,
                        business_id = %reservation.business_id,
                        lines = lines.len(),
                        "Hold placed"
                    );
                    return Ok(reservation);
                }
                Err(outcome) => attempt = self.handle_attempt_failure("place_hold", outcome, attempt).await?,
            }
        }
    }

    async fn try_place_hold(
        &self,
        reservation_id: &str,
        request: &HoldRequest,
        lines: &[HoldLine],
    ) -> Result<Reservation, AttemptError> {
        let mut tx: Transaction<'_, Sqlite> = self.db.pool().begin().await?;

        // Idempotent replay: this logical request already committed.
        if let Some(existing) = reservation::get_reservation(&mut tx, reservation_id).await? {
            if existing.business_id != request.business_id {
                return Err(AttemptError::Halt(EngineError::InvalidInput(format!(
                    "reservation id {} already belongs to another business",
                    reservation_id
                ))));
            }
            debug!(reservation_id, "Replayed hold request; returning existing reservation");
            return Ok(existing);
        }

        let business = business::get_business(&mut tx, &request.business_id)
            .await?
            .ok_or_else(|| {
                AttemptError::Halt(EngineError::BusinessNotFound(request.business_id.clone()))
            })?;
        let buffers = business.buffers();

        let now = Utc::now();
        let reservation = Reservation {
            id: reservation_id.to_string(),
            business_id: request.business_id.clone(),
            status: ReservationStatus::Hold,
            expires_at: Some(now + Duration::minutes(self.config.hold_ttl_minutes)),
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        // A UNIQUE violation on the id means a concurrent attempt of the
        // same logical request committed between our replay check and this
        // insert; retrying lands in the replay path and returns that row.
        if let Err(err) = reservation::insert_reservation(&mut tx, &reservation).await {
            return Err(match err {
                DbError::UniqueViolation { .. } => AttemptError::Db(DbError::Busy(format!(
                    "reservation {} committed concurrently",
                    reservation_id
                ))),
                other => AttemptError::Db(other),
            });
        }

        for line in lines {
            let sku = inventory::get_sku(&mut tx, &line.sku_id)
                .await?
                .filter(|s| s.is_active && s.business_id == request.business_id)
                .ok_or_else(|| {
                    AttemptError::Halt(EngineError::SkuNotFound(line.sku_id.clone()))
                })?;

            // No self-exclusion here: lines of the same SKU inserted earlier
            // in this transaction legitimately consume availability.
            let check = availability::check_window(&line.window, &buffers);
            let snapshots =
                reservation::live_snapshots(&mut tx, &line.sku_id, None, &check, now).await?;
            let available =
                availability::available_units(sku.total_quantity, &snapshots, &line.window, &buffers);

            if available < line.quantity {
                debug!(
                    reservation_id,
                    sku_id = %line.sku_id,
                    requested = line.quantity,
                    available,
                    "Hold rejected: insufficient availability"
                );
                // Dropping the transaction rolls back the reservation row.
                return Err(AttemptError::Conflict {
                    sku_id: line.sku_id.clone(),
                    requested: line.quantity,
                    available,
                });
            }

            reservation::insert_line(
                &mut tx,
                &ReservationLine {
                    id: generate_line_id(),
                    reservation_id: reservation_id.to_string(),
                    sku_id: line.sku_id.clone(),
                    quantity: line.quantity,
                    start_utc: line.window.start,
                    end_utc: line.window.end,
                    line_status: ReservationStatus::Hold,
                    created_at: now,
                },
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(reservation)
    }

    // -------------------------------------------------------------------------
    // promote
    // -------------------------------------------------------------------------

    /// Promotes a hold into a pending or confirmed booking.
    ///
    /// Availability is re-validated against fresh state because time has
    /// passed since the hold was placed. Promoting an already-promoted
    /// reservation is an idempotent no-op returning the stored reservation;
    /// it never creates a duplicate.
    pub async fn promote(
        &self,
        reservation_id: &str,
        request: PromoteRequest,
    ) -> EngineResult<Reservation> {
        validate_id("reservation_id", reservation_id)?;

        if !matches!(
            request.target,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        ) {
            return Err(EngineError::InvalidInput(format!(
                "promotion target must be pending or confirmed, not {:?}",
                request.target
            )));
        }
        if let Some(lines) = &request.lines {
            validate_hold_lines(lines)?;
        }

        let mut attempt = 1u32;
        loop {
            match self.try_promote(reservation_id, &request).await {
                Ok(reservation) => {
                    info!(
                        reservation_id = %reservation.id,
                        status = ?reservation.status,
                        "Reservation promoted"
                    );
                    return Ok(reservation);
                }
                Err(outcome) => attempt = self.handle_attempt_failure("promote", outcome, attempt).await?,
            }
        }
    }

    async fn try_promote(
        &self,
        reservation_id: &str,
        request: &PromoteRequest,
    ) -> Result<Reservation, AttemptError> {
        let mut tx: Transaction<'_, Sqlite> = self.db.pool().begin().await?;
        let now = Utc::now();

        let existing = reservation::get_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| {
                AttemptError::Halt(EngineError::NotFound(reservation_id.to_string()))
            })?;

        match promotion_eligibility(&existing, now) {
            PromotionEligibility::Promotable => {}
            PromotionEligibility::AlreadyPromoted => {
                debug!(reservation_id, "Already promoted; returning stored reservation");
                return Ok(existing);
            }
            PromotionEligibility::Expired => {
                return Err(AttemptError::Halt(EngineError::Expired(
                    reservation_id.to_string(),
                )));
            }
            PromotionEligibility::NotPromotable => {
                return Err(AttemptError::Halt(EngineError::NotPromotable {
                    id: reservation_id.to_string(),
                    status: existing.status,
                }));
            }
        }

        let business = business::get_business(&mut tx, &existing.business_id)
            .await?
            .ok_or_else(|| {
                AttemptError::Halt(EngineError::BusinessNotFound(existing.business_id.clone()))
            })?;
        let buffers = business.buffers();

        match &request.lines {
            // Replacement line set: drop the held lines and run the same
            // check-then-insert loop a fresh hold uses.
            Some(new_lines) => {
                reservation::delete_lines(&mut tx, reservation_id).await?;

                let mut sorted = new_lines.clone();
                sorted.sort_by(|a, b| {
                    (a.sku_id.as_str(), a.window.start).cmp(&(b.sku_id.as_str(), b.window.start))
                });

                for line in &sorted {
                    let sku = inventory::get_sku(&mut tx, &line.sku_id)
                        .await?
                        .filter(|s| s.is_active && s.business_id == existing.business_id)
                        .ok_or_else(|| {
                            AttemptError::Halt(EngineError::SkuNotFound(line.sku_id.clone()))
                        })?;

                    let check = availability::check_window(&line.window, &buffers);
                    let snapshots =
                        reservation::live_snapshots(&mut tx, &line.sku_id, None, &check, now)
                            .await?;
                    let available = availability::available_units(
                        sku.total_quantity,
                        &snapshots,
                        &line.window,
                        &buffers,
                    );

                    if available < line.quantity {
                        return Err(AttemptError::Conflict {
                            sku_id: line.sku_id.clone(),
                            requested: line.quantity,
                            available,
                        });
                    }

                    reservation::insert_line(
                        &mut tx,
                        &ReservationLine {
                            id: generate_line_id(),
                            reservation_id: reservation_id.to_string(),
                            sku_id: line.sku_id.clone(),
                            quantity: line.quantity,
                            start_utc: line.window.start,
                            end_utc: line.window.end,
                            line_status: request.target,
                            created_at: now,
                        },
                    )
                    .await?;
                }
            }

            // Existing lines: re-validate each against everything except
            // this reservation itself, counting overlapping sibling lines
            // of the same SKU explicitly.
            None => {
                let held_lines = reservation::get_lines(&mut tx, reservation_id).await?;

                for (index, line) in held_lines.iter().enumerate() {
                    let sku = inventory::get_sku(&mut tx, &line.sku_id)
                        .await?
                        .filter(|s| s.is_active)
                        .ok_or_else(|| {
                            AttemptError::Halt(EngineError::SkuNotFound(line.sku_id.clone()))
                        })?;

                    let window = line.window();
                    let check = availability::check_window(&window, &buffers);
                    let snapshots = reservation::live_snapshots(
                        &mut tx,
                        &line.sku_id,
                        Some(reservation_id),
                        &check,
                        now,
                    )
                    .await?;

                    let siblings: Vec<LineSnapshot> = held_lines
                        .iter()
                        .enumerate()
                        .filter(|(other_index, other)| {
                            *other_index != index && other.sku_id == line.sku_id
                        })
                        .map(|(_, other)| LineSnapshot {
                            reservation_id: other.reservation_id.clone(),
                            quantity: other.quantity,
                            window: other.window(),
                        })
                        .collect();

                    let available = availability::available_units(
                        sku.total_quantity,
                        &snapshots,
                        &window,
                        &buffers,
                    ) - availability::reserved_units(&siblings, &check);

                    if available < line.quantity {
                        return Err(AttemptError::Conflict {
                            sku_id: line.sku_id.clone(),
                            requested: line.quantity,
                            available: available.max(0),
                        });
                    }
                }

                reservation::update_line_status(&mut tx, reservation_id, request.target).await?;
            }
        }

        reservation::apply_promotion(
            &mut tx,
            reservation_id,
            request.target,
            request.customer_name.as_deref(),
            request.customer_email.as_deref(),
            request.customer_phone.as_deref(),
            request.notes.as_deref(),
            now,
        )
        .await?;

        let promoted = reservation::get_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| {
                AttemptError::Db(DbError::Internal(
                    "promoted reservation vanished mid-transaction".to_string(),
                ))
            })?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(promoted)
    }

    // -------------------------------------------------------------------------
    // Advisory availability
    // -------------------------------------------------------------------------

    /// Advisory read: how many units of `sku_id` are free for `window`?
    ///
    /// `exclude_reservation_id` lets a client re-check a window against
    /// everything except its own hold. The answer can go stale the moment a
    /// concurrent writer commits; the reservation transaction re-validates
    /// before any write.
    pub async fn availability(
        &self,
        sku_id: &str,
        window: &TimeWindow,
        exclude_reservation_id: Option<&str>,
    ) -> EngineResult<i64> {
        validate_id("sku_id", sku_id)?;

        let sku = self
            .db
            .inventory()
            .get_by_id(sku_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| EngineError::SkuNotFound(sku_id.to_string()))?;

        let buffers = self
            .db
            .businesses()
            .get_buffers(&sku.business_id)
            .await
            .map_err(|err| match err {
                DbError::NotFound { .. } => EngineError::BusinessNotFound(sku.business_id.clone()),
                other => EngineError::Internal(other),
            })?;

        let now = Utc::now();
        let check = availability::check_window(window, &buffers);

        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
        let snapshots = reservation::live_snapshots(
            &mut conn,
            sku_id,
            exclude_reservation_id,
            &check,
            now,
        )
        .await?;

        Ok(availability::available_units(
            sku.total_quantity,
            &snapshots,
            window,
            &buffers,
        ))
    }

    // -------------------------------------------------------------------------
    // Janitor
    // -------------------------------------------------------------------------

    /// Sweeps holds that expired more than `grace` ago into `cancelled`.
    ///
    /// Hygiene only: expired holds already count for nothing. Returns the
    /// number of reservations swept.
    pub async fn expire_stale_holds(&self, grace: Duration) -> EngineResult<u64> {
        let cutoff = Utc::now() - grace;
        Ok(self.db.reservations().expire_stale_holds(cutoff).await?)
    }

    // -------------------------------------------------------------------------
    // Retry plumbing
    // -------------------------------------------------------------------------

    /// Decides what a failed attempt means: a typed terminal error, or the
    /// next attempt number after a backoff sleep.
    async fn handle_attempt_failure(
        &self,
        operation: &'static str,
        outcome: AttemptError,
        attempt: u32,
    ) -> EngineResult<u32> {
        match outcome {
            AttemptError::Conflict {
                sku_id,
                requested,
                available,
            } => Err(EngineError::Conflict {
                sku_id,
                requested,
                available,
            }),

            AttemptError::Halt(err) => Err(err),

            AttemptError::Db(db_err) => match classify(&db_err) {
                FailureClass::Fatal => Err(EngineError::Internal(db_err)),
                FailureClass::Transient => {
                    if matches!(db_err, DbError::Internal(_)) {
                        warn!(operation, error = %db_err, "Unrecognized database error treated as transient");
                    }
                    if attempt >= self.config.max_attempts {
                        warn!(
                            operation,
                            attempts = attempt,
                            error = %db_err,
                            "Retry budget exhausted"
                        );
                        return Err(EngineError::Transient(db_err.to_string()));
                    }
                    let delay = self.backoff_delay(attempt);
                    debug!(operation, attempt, delay_ms = delay.as_millis() as u64, "Transient failure; backing off");
                    tokio::time::sleep(delay).await;
                    Ok(attempt + 1)
                }
            },
        }
    }

    /// `base × attempt + random jitter`.
    fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let jitter_ms = self.config.backoff_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.config.backoff_base * attempt + std::time::Duration::from_millis(jitter)
    }
}

/// Generates a new reservation line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.hold_ttl_minutes, 30);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_backoff_grows_with_attempt() {
        let config = EngineConfig {
            backoff_jitter: std::time::Duration::ZERO,
            ..EngineConfig::default()
        };
        // Delay math is pure given zero jitter.
        let base = config.backoff_base;
        assert_eq!(base * 1, std::time::Duration::from_millis(50));
        assert_eq!(base * 3, std::time::Duration::from_millis(150));
    }
}
