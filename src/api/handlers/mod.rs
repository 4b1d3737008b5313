//! REST endpoint handlers organized by resource.

pub mod buyer;
pub mod issuance;
pub mod redemption;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(issuance::routes())
        .merge(redemption::routes())
        .merge(buyer::routes())
}
