//! Redemption outcomes and the append-only audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Business-level outcome of a single redemption attempt.
///
/// These are first-class results, not errors: the HTTP layer returns all of
/// them with status 200 so that retrying infrastructure does not treat a
/// rejected scan as a transient failure.
///
/// The audit trail stores the specific terminal state (`void`, `refunded`)
/// rather than coarsening everything to `already_used`, so that repeated
/// scans of administratively cancelled tickets remain distinguishable during
/// a fraud investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionOutcome {
    /// The ticket was active and is now consumed.
    Ok,
    /// The ticket had already been redeemed.
    AlreadyUsed,
    /// The ticket was administratively voided.
    Void,
    /// The ticket was refunded.
    Refunded,
    /// No ticket exists with the scanned code.
    Invalid,
}

impl RedemptionOutcome {
    /// Returns `true` only for a successful redemption.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Storage representation of the outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::AlreadyUsed => "already_used",
            Self::Void => "void",
            Self::Refunded => "refunded",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for RedemptionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RedemptionOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "already_used" => Ok(Self::AlreadyUsed),
            "void" => Ok(Self::Void),
            "refunded" => Ok(Self::Refunded),
            "invalid" => Ok(Self::Invalid),
            other => Err(format!("unknown redemption outcome: {other}")),
        }
    }
}

/// One audit row per scan, appended by the Redemption Engine as the terminal
/// step of every redemption call — including failed and invalid attempts.
/// Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionAttempt {
    /// Row identifier.
    pub id: Uuid,
    /// Scanned code. Not required to reference an existing ticket: invalid
    /// codes are logged too, to support abuse investigation.
    pub ticket_code: String,
    /// Gate or kiosk that performed the scan.
    pub gate_id: String,
    /// When the attempt happened.
    pub attempted_at: DateTime<Utc>,
    /// Best-effort network origin of the scanning client.
    pub origin: Option<String>,
    /// Best-effort client descriptor (e.g. user agent).
    pub client: Option<String>,
    /// What the attempt produced.
    pub outcome: RedemptionOutcome,
}

impl RedemptionAttempt {
    /// Builds an audit row for a scan of `ticket_code` at `gate_id`.
    #[must_use]
    pub fn record(
        ticket_code: &str,
        gate_id: &str,
        attempted_at: DateTime<Utc>,
        origin: Option<String>,
        client: Option<String>,
        outcome: RedemptionOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_code: ticket_code.to_string(),
            gate_id: gate_id.to_string(),
            attempted_at,
            origin,
            client,
            outcome,
        }
    }
}
