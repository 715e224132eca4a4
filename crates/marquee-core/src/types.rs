//! # Domain Types
//!
//! Core domain types for the Marquee reservation engine.
//!
//! ## Type Overview
//! ```text
//! Business          buffer configuration + IANA time zone (collaborator)
//! InventorySku      finite pool of interchangeable physical units
//! Reservation       a hold or booking; owns ReservationLines
//! ReservationLine   {sku, quantity, exact rental window}
//! TimeWindow        half-open [start, end) rental window in UTC
//! BufferConfig      setup/teardown padding applied at check time
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Entities carry a UUID `id` for relations plus a human-readable business
//! code where one exists (`sku`). Reservation ids may be minted by clients
//! so that retries of one logical request stay idempotent.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Time Window
// =============================================================================

/// An exact, unbuffered rental window in UTC.
///
/// The convention everywhere in the engine is `[start, end)`: a unit is out
/// from `start` and back at `end`. Overlap testing between *buffered*
/// windows is inclusive at both endpoints — touching windows conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window, enforcing `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidFormat {
                field: "window".to_string(),
                reason: format!("end ({}) must be after start ({})", end, start),
            });
        }
        Ok(TimeWindow { start, end })
    }

    /// Returns this window widened by the business's buffers.
    ///
    /// Buffers are strictly additive safety margins: zero buffers return
    /// the window unchanged.
    pub fn padded(&self, buffers: &BufferConfig) -> TimeWindow {
        TimeWindow {
            start: self.start - buffers.before(),
            end: self.end + buffers.after(),
        }
    }

    /// Inclusive overlap test: windows that merely touch at an endpoint are
    /// considered intersecting. Applied uniformly regardless of buffer
    /// configuration.
    pub fn intersects(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Window length.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

// =============================================================================
// Buffer Configuration
// =============================================================================

/// Mandatory setup/teardown padding around every reservation of a business.
///
/// Stored in whole minutes (integer units end to end, no floats in the
/// engine). Buffers are never persisted per-reservation; they are applied
/// at availability-check time so a configuration change takes effect for
/// all future checks immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BufferConfig {
    /// Setup time before the rental window, in minutes.
    pub before_mins: i64,
    /// Teardown time after the rental window, in minutes.
    pub after_mins: i64,
}

impl BufferConfig {
    /// Creates a buffer configuration, rejecting negative values.
    pub fn from_minutes(before_mins: i64, after_mins: i64) -> Result<Self, ValidationError> {
        if before_mins < 0 {
            return Err(ValidationError::MustBePositive {
                field: "buffer_before_mins".to_string(),
            });
        }
        if after_mins < 0 {
            return Err(ValidationError::MustBePositive {
                field: "buffer_after_mins".to_string(),
            });
        }
        Ok(BufferConfig {
            before_mins,
            after_mins,
        })
    }

    /// Zero buffers: checks degenerate to the exact requested window.
    #[inline]
    pub const fn none() -> Self {
        BufferConfig {
            before_mins: 0,
            after_mins: 0,
        }
    }

    /// Setup padding as a duration.
    #[inline]
    pub fn before(&self) -> Duration {
        Duration::minutes(self.before_mins)
    }

    /// Teardown padding as a duration.
    #[inline]
    pub fn after(&self) -> Duration {
        Duration::minutes(self.after_mins)
    }

    /// True when both paddings are zero.
    #[inline]
    pub const fn is_none(&self) -> bool {
        self.before_mins == 0 && self.after_mins == 0
    }
}

// =============================================================================
// Business
// =============================================================================

/// A tenant business. Read-only to the engine: the surrounding SaaS owns
/// creation and editing; the engine consumes buffers and the time zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// IANA time zone identifier (e.g. "America/Chicago").
    pub time_zone: String,

    /// Setup buffer in minutes.
    pub buffer_before_mins: i64,

    /// Teardown buffer in minutes.
    pub buffer_after_mins: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Business {
    /// Returns the business's buffer configuration.
    #[inline]
    pub fn buffers(&self) -> BufferConfig {
        BufferConfig {
            before_mins: self.buffer_before_mins,
            after_mins: self.buffer_after_mins,
        }
    }
}

// =============================================================================
// Inventory SKU
// =============================================================================

/// A rentable inventory type with a fixed total unit count.
///
/// Reservations never reference a specific physical unit, only a SKU and a
/// quantity; the units are interchangeable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySku {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning business.
    pub business_id: String,

    /// Human-readable inventory code (e.g. "CASTLE-12FT").
    pub sku: String,

    /// Display name shown in listings.
    pub name: String,

    /// Maximum number of interchangeable physical units the business owns.
    pub total_quantity: i64,

    /// Whether the SKU is currently sellable (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Reservation Status
// =============================================================================

/// The status of a reservation.
///
/// See [`crate::lifecycle`] for the transition table and the liveness
/// predicate that drives availability counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Time-limited, not-yet-paid claim on inventory.
    Hold,
    /// Promoted, awaiting final confirmation (e.g. payment capture).
    Pending,
    /// Confirmed booking.
    Confirmed,
    /// Cancelled; permanently excluded from conflict counting.
    Cancelled,
    /// Fulfilled and returned; permanently excluded from conflict counting.
    Completed,
}

impl ReservationStatus {
    /// Stable lowercase name, matching the persisted representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Hold => "hold",
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Hold
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// A reservation: a hold or a promoted booking.
///
/// Customer fields are absent on holds and populated at promotion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub business_id: String,
    pub status: ReservationStatus,
    /// Set while status is `Hold`; cleared on promotion.
    pub expires_at: Option<DateTime<Utc>>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Reservation Line
// =============================================================================

/// A line item within a reservation: a quantity of one SKU over an exact,
/// unbuffered rental window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationLine {
    pub id: String,
    pub reservation_id: String,
    pub sku_id: String,
    /// Units claimed; always ≥ 1.
    pub quantity: i64,
    /// Exact rental window start (unbuffered).
    pub start_utc: DateTime<Utc>,
    /// Exact rental window end (unbuffered).
    pub end_utc: DateTime<Utc>,
    /// Mirrors the reservation status at write time.
    pub line_status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl ReservationLine {
    /// The line's exact rental window.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_utc,
            end: self.end_utc,
        }
    }
}

// =============================================================================
// Hold Request Line
// =============================================================================

/// One requested line of a hold: a quantity of a SKU over a window.
///
/// This is the request-side shape consumed by the reservation transaction;
/// [`ReservationLine`] is the persisted result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldLine {
    pub sku_id: String,
    pub quantity: i64,
    pub window: TimeWindow,
}

// =============================================================================
// Unit Tests
// =============================================================================
