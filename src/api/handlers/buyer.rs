//! Buyer-scoped read endpoints.
//!
//! Everything here is scoped to the calling identity: queries filter by the
//! caller's id at the store, and a purchase owned by someone else is
//! reported absent rather than forbidden, so existence never leaks.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::Caller;
use crate::api::dto::{OwnerTicketsParams, PurchaseDto, TicketDto};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GateError};

/// `GET /api/v1/me/tickets` — The caller's own tickets, most recent first.
///
/// # Errors
///
/// Returns [`GateError`] when the caller is unauthenticated or on store
/// failure.
#[utoipa::path(
    get,
    path = "/api/v1/me/tickets",
    tag = "Buyer",
    summary = "List the caller's tickets",
    description = "Returns the authenticated buyer's own tickets, newest first. Defaults to 10, capped at 100.",
    params(OwnerTicketsParams),
    responses(
        (status = 200, description = "The caller's tickets", body = Vec<TicketDto>),
        (status = 401, description = "No caller identity", body = ErrorResponse),
    )
)]
pub async fn my_tickets(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<OwnerTicketsParams>,
) -> Result<impl IntoResponse, GateError> {
    let tickets = state
        .ticket_service
        .tickets_for_owner(&caller.id, params.limit)
        .await?;
    let data: Vec<TicketDto> = tickets.into_iter().map(TicketDto::from).collect();
    Ok((StatusCode::OK, Json(data)))
}

/// `GET /api/v1/me/purchases/{session_id}` — One of the caller's purchases.
///
/// # Errors
///
/// Returns [`GateError`] when the caller is unauthenticated, when no
/// purchase under this session id is visible to the caller, or on store
/// failure.
#[utoipa::path(
    get,
    path = "/api/v1/me/purchases/{session_id}",
    tag = "Buyer",
    summary = "Get one of the caller's purchases",
    description = "Returns the purchase for the given checkout session if it belongs to the caller. Purchases of other identities are reported as not found.",
    params(
        ("session_id" = String, Path, description = "External payment-session identifier"),
    ),
    responses(
        (status = 200, description = "The purchase", body = PurchaseDto),
        (status = 401, description = "No caller identity", body = ErrorResponse),
        (status = 404, description = "No such purchase visible to the caller", body = ErrorResponse),
    )
)]
pub async fn my_purchase(
    State(state): State<AppState>,
    caller: Caller,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, GateError> {
    let purchase = state
        .ticket_service
        .purchase_for_owner(&caller.id, &session_id)
        .await?;
    Ok((StatusCode::OK, Json(PurchaseDto::from(purchase))))
}

/// Buyer routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me/tickets", get(my_tickets))
        .route("/me/purchases/{session_id}", get(my_purchase))
}
