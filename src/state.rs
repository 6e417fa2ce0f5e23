//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It only holds the database pool: every list and item lives in Postgres,
//! and per-request consistency comes from the transaction each service
//! operation opens. Nothing is cached in memory between requests.

use sqlx::PgPool;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; `PgPool` is reference counted internally.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
