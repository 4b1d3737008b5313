//! Redemption endpoints: gate scan and validator lookup.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::{Caller, GATE_ROLE};
use crate::api::dto::{
    RedeemRequest, RedeemResponse, TicketSummaryDto, ValidateParams, ValidateResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GateError};
use crate::service::RedeemCommand;

/// `POST /api/v1/tickets/redeem` — Consume a ticket at a gate.
///
/// Requires the `gate` role. At most one call per code ever succeeds; every
/// call — success, replay, unknown code — appends one audit row and returns
/// HTTP 200 with the outcome in the body.
///
/// # Errors
///
/// Returns [`GateError`] when the caller is unauthenticated or lacks the
/// gate role, when required fields are blank, or on store failure.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/redeem",
    tag = "Redemption",
    summary = "Redeem a scanned ticket",
    description = "Atomically transitions the ticket from active to used. Replayed or concurrent scans of the same code are rejected deterministically with the ticket's terminal state.",
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Scan outcome (ok, already_used, void, refunded, or invalid)", body = RedeemResponse),
        (status = 400, description = "Blank ticket code or gate id", body = ErrorResponse),
        (status = 401, description = "No caller identity", body = ErrorResponse),
        (status = 403, description = "Caller lacks the gate role", body = ErrorResponse),
    )
)]
pub async fn redeem(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
    Json(req): Json<RedeemRequest>,
) -> Result<impl IntoResponse, GateError> {
    caller.require_role(GATE_ROLE)?;

    // Best-effort diagnostics for the audit trail.
    let origin = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let client = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let cmd = RedeemCommand {
        ticket_code: req.ticket_code,
        gate_id: req.gate_id,
        origin,
        client,
    };
    let receipt = state.ticket_service.redeem(&cmd).await?;
    Ok((StatusCode::OK, Json(RedeemResponse::from(receipt))))
}

/// `GET /api/v1/tickets/validate` — Look up a ticket without consuming it.
///
/// Any authenticated caller may validate; the response is the minimal public
/// projection with no owner or financial fields. Unknown codes are a normal
/// `found: false` response, not a 404.
///
/// # Errors
///
/// Returns [`GateError`] when the caller is unauthenticated, the code
/// parameter is blank, or on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/tickets/validate",
    tag = "Redemption",
    summary = "Validate a ticket code",
    description = "Read-only lookup returning code, event reference, status, and issuance time.",
    params(ValidateParams),
    responses(
        (status = 200, description = "Lookup result", body = ValidateResponse),
        (status = 400, description = "Blank code parameter", body = ErrorResponse),
        (status = 401, description = "No caller identity", body = ErrorResponse),
    )
)]
pub async fn validate(
    State(state): State<AppState>,
    _caller: Caller,
    Query(params): Query<ValidateParams>,
) -> Result<impl IntoResponse, GateError> {
    let code = params.code.trim();
    if code.is_empty() {
        return Err(GateError::InvalidRequest("code is required".to_string()));
    }
    let summary = state.ticket_service.validate(code).await?;
    let response = ValidateResponse {
        found: summary.is_some(),
        ticket: summary.map(TicketSummaryDto::from),
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Redemption routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tickets/redeem", post(redeem))
        .route("/tickets/validate", get(validate))
}
