//! Ticket and purchase read DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{PaymentStatus, Purchase, Ticket, TicketStatus};
use crate::service::TicketSummary;

/// Query parameters for `GET /api/v1/tickets/validate`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ValidateParams {
    /// Ticket code to look up.
    pub code: String,
}

/// Minimal ticket projection exposed to validators. No owner or financial
/// fields.
#[derive(Debug, Serialize, ToSchema)]
pub struct TicketSummaryDto {
    /// Scannable code.
    pub code: String,
    /// Event the ticket admits to.
    pub event_ref: String,
    /// Current status.
    pub status: TicketStatus,
    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,
}

impl From<TicketSummary> for TicketSummaryDto {
    fn from(s: TicketSummary) -> Self {
        Self {
            code: s.code,
            event_ref: s.event_ref,
            status: s.status,
            issued_at: s.issued_at,
        }
    }
}

/// Response body for `GET /api/v1/tickets/validate`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    /// Whether a ticket exists with the given code.
    pub found: bool,
    /// The projection, when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketSummaryDto>,
}

/// Query parameters for `GET /api/v1/me/tickets`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OwnerTicketsParams {
    /// Maximum number of tickets to return (default 10, max 100).
    #[serde(default)]
    pub limit: Option<i64>,
}

/// A buyer's own ticket, as returned by `GET /api/v1/me/tickets`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TicketDto {
    /// Scannable code (the QR payload the buyer presents at the gate).
    pub code: String,
    /// Event the ticket admits to.
    pub event_ref: String,
    /// Originating checkout session.
    pub session_id: String,
    /// Current status.
    pub status: TicketStatus,
    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,
    /// Validity window start, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    /// Validity window end, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// When the ticket was redeemed, if it has been.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl From<Ticket> for TicketDto {
    fn from(t: Ticket) -> Self {
        Self {
            code: t.code.into_string(),
            event_ref: t.event_ref,
            session_id: t.session_id,
            status: t.status,
            issued_at: t.issued_at,
            valid_from: t.valid_from,
            valid_until: t.valid_until,
            redeemed_at: t.redeemed_at,
        }
    }
}

/// A buyer's own purchase, as returned by `GET /api/v1/me/purchases/{session_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseDto {
    /// External payment-session identifier.
    pub session_id: String,
    /// Event the purchase admits to.
    pub event_ref: String,
    /// Total amount in minor currency units.
    pub amount_total: i64,
    /// ISO currency code.
    pub currency: String,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Ordered codes of every ticket minted for this session.
    pub ticket_codes: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Purchase> for PurchaseDto {
    fn from(p: Purchase) -> Self {
        Self {
            session_id: p.session_id,
            event_ref: p.event_ref,
            amount_total: p.amount_total,
            currency: p.currency,
            payment_status: p.payment_status,
            ticket_codes: p.ticket_codes,
            created_at: p.created_at,
        }
    }
}
