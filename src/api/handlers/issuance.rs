//! Issuance endpoints: webhook ingest and the internal issue surface.
//!
//! Both surfaces are reachable only with the shared ingest secret. The
//! payment collaborator verifies event authenticity (signatures) upstream;
//! here the token is checked again as the last line of defense, and the
//! event body is parsed strictly so unrecognized shapes fail closed.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::bearer_token;
use crate::api::dto::{
    IssueRequest, IssueResponse, LedgerEntryDto, RecentEventsParams, WebhookResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GateError};
use crate::service::IssueCommand;

/// `POST /webhooks/checkout` — Ingest one payment-completion delivery.
///
/// Delivery is at-least-once: duplicates are dropped at the event ledger and
/// redelivered sessions mint nothing new, so a 200 here never means "minted"
/// by itself — the body says what happened.
///
/// # Errors
///
/// Returns [`GateError`] on a missing/wrong bearer token, a malformed event
/// body, or store failure (5xx, which the delivery infrastructure retries —
/// safe, because ingest is idempotent).
#[utoipa::path(
    post,
    path = "/webhooks/checkout",
    tag = "Issuance",
    summary = "Ingest a checkout-completed event",
    description = "Accepts one verified payment-completion event. Deduplicates by event id, then mints any tickets still missing for the session. Safe under arbitrary redelivery.",
    request_body = String,
    responses(
        (status = 200, description = "Event processed or recognized as duplicate", body = WebhookResponse),
        (status = 400, description = "Malformed event (fails closed)", body = ErrorResponse),
        (status = 401, description = "Missing or wrong ingest token", body = ErrorResponse),
    )
)]
pub async fn checkout_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, GateError> {
    let token = bearer_token(&headers)?;
    let receipt = state.ticket_service.ingest(token, &body).await?;
    Ok((StatusCode::OK, Json(WebhookResponse::from(receipt))))
}

/// `POST /api/v1/issue` — Mint tickets for a paid session.
///
/// Trusted internal surface for service-to-service callers (e.g. a backfill
/// job replaying provider records). Same idempotency contract as the
/// webhook: identical calls mint nothing the second time.
///
/// # Errors
///
/// Returns [`GateError`] on a missing/wrong bearer token, a non-positive
/// quantity, missing fields, or store failure.
#[utoipa::path(
    post,
    path = "/api/v1/issue",
    tag = "Issuance",
    summary = "Issue tickets for a checkout session",
    description = "Ensures exactly `quantity` tickets exist for the session, minting only the missing ones. Idempotent per session; larger quantities top up, smaller ones never shrink.",
    request_body = IssueRequest,
    responses(
        (status = 200, description = "Full ticket set for the session", body = IssueResponse),
        (status = 400, description = "Invalid quantity or missing field", body = ErrorResponse),
        (status = 401, description = "Missing or wrong ingest token", body = ErrorResponse),
    )
)]
pub async fn issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IssueRequest>,
) -> Result<impl IntoResponse, GateError> {
    let token = bearer_token(&headers)?;
    let cmd = IssueCommand {
        session_id: req.session_id,
        event_ref: req.event_ref,
        buyer: req.buyer,
        quantity: req.quantity,
        amount_total: req.amount_total,
        currency: req.currency,
        occurred_at: req.occurred_at,
        valid_from: req.valid_from,
        valid_until: req.valid_until,
    };
    let receipt = state.ticket_service.issue(token, &cmd).await?;
    Ok((StatusCode::OK, Json(IssueResponse::from(receipt))))
}

/// `GET /api/v1/events/recent` — Operator view of the delivery ledger.
///
/// Debugging surface for delivery incidents: shows which event ids have been
/// recorded and the digest of each body, newest first.
///
/// # Errors
///
/// Returns [`GateError`] on a missing/wrong bearer token or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/events/recent",
    tag = "Issuance",
    summary = "List recently received checkout events",
    description = "Returns the most recent delivery-ledger rows, newest first. Defaults to 10, capped at 100.",
    params(RecentEventsParams),
    responses(
        (status = 200, description = "Recent ledger rows", body = Vec<LedgerEntryDto>),
        (status = 401, description = "Missing or wrong ingest token", body = ErrorResponse),
    )
)]
pub async fn recent_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RecentEventsParams>,
) -> Result<impl IntoResponse, GateError> {
    let token = bearer_token(&headers)?;
    let events = state
        .ticket_service
        .recent_events(token, params.limit)
        .await?;
    let data: Vec<LedgerEntryDto> = events.into_iter().map(LedgerEntryDto::from).collect();
    Ok((StatusCode::OK, Json(data)))
}

/// Issuance routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/issue", post(issue))
        .route("/events/recent", get(recent_events))
}

/// Webhook routes mounted at the root level (not under /api/v1).
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks/checkout", post(checkout_webhook))
}
