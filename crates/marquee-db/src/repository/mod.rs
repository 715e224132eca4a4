//! # Repository Module
//!
//! Database repository implementations for Marquee.
//!
//! Each repository holds a pool clone and exposes read paths; the
//! transaction-scoped write/read helpers take `&mut SqliteConnection` so
//! the reservation engine can compose them inside a single transaction.
//! Pool-level methods acquire a connection and delegate to the same
//! helpers — one SQL statement per operation, regardless of entry point.
//!
//! ## Available Repositories
//!
//! - [`business::BusinessRepository`] - buffer/zone reads, provisioning
//! - [`inventory::InventoryRepository`] - SKU reads, provisioning
//! - [`reservation::ReservationRepository`] - reservations and lines

pub mod business;
pub mod inventory;
pub mod reservation;

use chrono::{DateTime, Utc};

/// Converts an instant to the persisted representation (epoch seconds).
pub(crate) fn to_epoch(instant: DateTime<Utc>) -> i64 {
    instant.timestamp()
}

/// Converts persisted epoch seconds back to an instant.
///
/// Values outside chrono's representable range (impossible for rows this
/// engine wrote) clamp to the epoch rather than panicking.
pub(crate) fn from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Optional variant of [`from_epoch`].
pub(crate) fn from_epoch_opt(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.map(from_epoch)
}
