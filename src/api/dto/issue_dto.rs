//! Issuance and webhook DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::EventRecord;
use crate::service::{IngestReceipt, IssueReceipt};

/// Request body for `POST /api/v1/issue`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueRequest {
    /// External payment-session identifier.
    pub session_id: String,
    /// Event the purchase admits to.
    pub event_ref: String,
    /// Buyer identity the tickets belong to.
    pub buyer: String,
    /// Number of admission rights purchased. Must be a positive integer.
    pub quantity: i64,
    /// Total amount in minor currency units.
    pub amount_total: i64,
    /// ISO currency code (e.g. `"usd"`).
    pub currency: String,
    /// When the checkout completed at the provider.
    pub occurred_at: DateTime<Utc>,
    /// Optional validity window start for the minted tickets.
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    /// Optional validity window end for the minted tickets.
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

/// Response body for `POST /api/v1/issue`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssueResponse {
    /// Session the tickets belong to.
    pub session_id: String,
    /// Full ordered code set for the session after this call.
    pub ticket_codes: Vec<String>,
    /// How many tickets this call actually minted (0 on redelivery).
    pub minted: u32,
}

impl From<IssueReceipt> for IssueResponse {
    fn from(receipt: IssueReceipt) -> Self {
        Self {
            session_id: receipt.session_id,
            ticket_codes: receipt.ticket_codes,
            minted: receipt.minted,
        }
    }
}

/// Response body for `POST /webhooks/checkout`.
///
/// Always HTTP 200 once the event was accepted or recognized, so the
/// delivery infrastructure stops retrying.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    /// `true` when the event id had already been processed and the delivery
    /// was dropped at the ledger.
    pub duplicate: bool,
    /// How many tickets this delivery minted.
    pub minted: u32,
    /// Session the event referred to, when the delivery was processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl From<IngestReceipt> for WebhookResponse {
    fn from(receipt: IngestReceipt) -> Self {
        let (minted, session_id) = receipt
            .issue
            .map_or((0, None), |i| (i.minted, Some(i.session_id)));
        Self {
            duplicate: receipt.duplicate,
            minted,
            session_id,
        }
    }
}

/// Query parameters for `GET /api/v1/events/recent`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentEventsParams {
    /// Maximum number of ledger rows to return (default 10, max 100).
    #[serde(default)]
    pub limit: Option<i64>,
}

/// One delivery-ledger row, as returned by `GET /api/v1/events/recent`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerEntryDto {
    /// External event id (unique per delivery).
    pub event_id: String,
    /// Event type discriminator.
    pub event_type: String,
    /// Arrival timestamp at this service.
    pub received_at: DateTime<Utc>,
    /// Hex SHA-256 of the raw delivery body.
    pub payload_digest: String,
}

impl From<EventRecord> for LedgerEntryDto {
    fn from(r: EventRecord) -> Self {
        Self {
            event_id: r.event_id,
            event_type: r.event_type,
            received_at: r.received_at,
            payload_digest: r.payload_digest,
        }
    }
}
