//! REST API layer: route handlers, DTOs, caller extraction, and router
//! composition.
//!
//! All business endpoints are mounted under `/api/v1`; the webhook and the
//! health check live at the root.

pub mod auth;
pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// OpenAPI document assembled from the handler annotations.
#[derive(Debug, utoipa::OpenApi)]
#[openapi(
    paths(
        handlers::issuance::checkout_webhook,
        handlers::issuance::issue,
        handlers::issuance::recent_events,
        handlers::redemption::redeem,
        handlers::redemption::validate,
        handlers::buyer::my_tickets,
        handlers::buyer::my_purchase,
        handlers::system::health_handler,
    ),
    components(schemas(
        crate::api::dto::IssueRequest,
        crate::api::dto::IssueResponse,
        crate::api::dto::WebhookResponse,
        crate::api::dto::LedgerEntryDto,
        crate::api::dto::RedeemRequest,
        crate::api::dto::RedeemResponse,
        crate::api::dto::ValidateResponse,
        crate::api::dto::TicketSummaryDto,
        crate::api::dto::TicketDto,
        crate::api::dto::PurchaseDto,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
    )),
    tags(
        (name = "Issuance", description = "Webhook ingest and ticket minting"),
        (name = "Redemption", description = "Gate scans and validator lookups"),
        (name = "Buyer", description = "Buyer-scoped reads"),
        (name = "System", description = "Health and diagnostics"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
///
/// With the `swagger-ui` feature (on by default) the OpenAPI document is
/// served at `/api-docs/openapi.json` with the UI at `/swagger-ui`.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(handlers::issuance::webhook_routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", <ApiDoc as utoipa::OpenApi>::openapi()),
    );

    router
}
