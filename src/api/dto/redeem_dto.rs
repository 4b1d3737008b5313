//! Redemption DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::RedemptionOutcome;
use crate::service::RedemptionReceipt;

/// Request body for `POST /api/v1/tickets/redeem`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemRequest {
    /// Scanned QR payload.
    pub ticket_code: String,
    /// Identifier of the redeeming gate or kiosk.
    pub gate_id: String,
}

/// Response body for `POST /api/v1/tickets/redeem`.
///
/// Every business outcome — success, replay, void, refunded, unknown code —
/// is returned with HTTP 200; `ok`/`code` carry the verdict. Gate UIs render
/// each code distinctly so staff can react (e.g. repeated `invalid` scans of
/// one code from different gates point at a forged or photographed QR).
#[derive(Debug, Serialize, ToSchema)]
pub struct RedeemResponse {
    /// `true` only when this call consumed the ticket.
    pub ok: bool,
    /// Outcome discriminator.
    pub code: RedemptionOutcome,
    /// The scanned ticket's code, when it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_code: Option<String>,
    /// When the ticket was consumed (by this or an earlier call).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Gate that consumed the ticket, when it has been consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_by: Option<String>,
}

impl From<RedemptionReceipt> for RedeemResponse {
    fn from(receipt: RedemptionReceipt) -> Self {
        let ticket = receipt.ticket;
        Self {
            ok: receipt.outcome.is_ok(),
            code: receipt.outcome,
            ticket_code: ticket.as_ref().map(|t| t.code.as_str().to_string()),
            redeemed_at: ticket.as_ref().and_then(|t| t.redeemed_at),
            redeemed_by: ticket.and_then(|t| t.redeemed_by),
        }
    }
}
