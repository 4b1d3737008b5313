//! Purchase record: one row per checkout session.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment status reported by the checkout provider for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment captured in full.
    Paid,
    /// No payment captured.
    Unpaid,
    /// Zero-amount session (e.g. fully discounted).
    NoPaymentRequired,
    /// Asynchronous payment method still settling.
    Processing,
    /// Payment attempt failed.
    Failed,
}

impl PaymentStatus {
    /// Storage representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::NoPaymentRequired => "no_payment_required",
            Self::Processing => "processing",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            "no_payment_required" => Ok(Self::NoPaymentRequired),
            "processing" => Ok(Self::Processing),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// One checkout transaction, keyed by the external payment-session id.
///
/// At most one purchase exists per session id (unique index). The
/// `ticket_codes` list is populated by the Issuance Engine and is
/// append-idempotent: re-running issuance for the same session merges, never
/// replaces or shrinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    /// External payment-session identifier (unique key).
    pub session_id: String,
    /// Event the purchase admits to.
    pub event_ref: String,
    /// Buyer identity that made the purchase.
    pub owner: String,
    /// Total amount in minor currency units.
    pub amount_total: i64,
    /// ISO currency code (lowercase, e.g. `"usd"`).
    pub currency: String,
    /// Payment status at the last delivery of the session's event.
    pub payment_status: PaymentStatus,
    /// Ordered codes of every ticket minted for this session.
    pub ticket_codes: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_string_round_trip() {
        for status in [
            PaymentStatus::Paid,
            PaymentStatus::Unpaid,
            PaymentStatus::NoPaymentRequired,
            PaymentStatus::Processing,
            PaymentStatus::Failed,
        ] {
            assert_eq!(PaymentStatus::from_str(status.as_str()), Ok(status));
        }
        assert!(PaymentStatus::from_str("settled").is_err());
    }
}
