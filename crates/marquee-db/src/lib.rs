//! # marquee-db: Database Layer for the Marquee Reservation Engine
//!
//! This crate provides SQLite persistence via sqlx and hosts the
//! reservation transaction — the single write path for reservation data.
//!
//! ## Architecture Position
//! ```text
//! booking-api (HTTP surface)
//!      │
//!      ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  marquee-db (THIS CRATE)                    │
//! │                                                             │
//! │  ┌───────────┐  ┌──────────────┐  ┌──────────────────────┐  │
//! │  │ Database  │  │ Repositories │  │  ReservationEngine   │  │
//! │  │ (pool.rs) │  │ business     │  │  place_hold          │  │
//! │  │ WAL mode  │◄─│ inventory    │◄─│  promote             │  │
//! │  │ busy t/o  │  │ reservation  │  │  availability        │  │
//! │  └───────────┘  └──────────────┘  │  expire_stale_holds  │  │
//! │                                   └──────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!      │
//!      ▼
//! SQLite database (WAL) — snapshot reads, one writer at a time
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types + the retry classifier
//! - [`repository`] - Repository implementations
//! - [`engine`] - The reservation transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use marquee_db::{Database, DbConfig, ReservationEngine};
//!
//! let db = Database::new(DbConfig::new("marquee.db")).await?;
//! let engine = ReservationEngine::new(db.clone());
//!
//! let held = engine.place_hold(request).await?;
//! let booked = engine.promote(&held.id, promote_request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{
    EngineConfig, EngineError, EngineResult, HoldRequest, PromoteRequest, ReservationEngine,
};
pub use error::{DbError, DbResult, FailureClass};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::business::BusinessRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::reservation::ReservationRepository;
