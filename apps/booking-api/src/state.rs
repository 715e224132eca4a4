//! Shared application state for HTTP handlers.
//!
//! Handlers only get what they need: the database handle for collaborator
//! reads and the engine for every reservation decision.

use marquee_db::{Database, ReservationEngine};

/// State shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Database handle for collaborator reads (businesses, SKUs, lines).
    pub db: Database,

    /// The reservation engine: the only write path.
    pub engine: ReservationEngine,
}

impl AppState {
    /// Creates the application state.
    pub fn new(db: Database, engine: ReservationEngine) -> Self {
        AppState { db, engine }
    }
}
