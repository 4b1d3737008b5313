//! Ticket record and its status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::TicketCode;
use super::redemption::RedemptionOutcome;

/// Lifecycle status of a ticket.
///
/// The only transition the service performs is `Active → Used` (successful
/// redemption). `Void` and `Refunded` are set by administrative flows outside
/// this service. All three non-active states are terminal: once a ticket
/// leaves `Active` no further redemption can succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Redeemable: the ticket has been issued and not yet consumed.
    Active,
    /// Consumed at a gate. Terminal.
    Used,
    /// Administratively voided. Terminal.
    Void,
    /// Refunded to the buyer. Terminal.
    Refunded,
}

impl TicketStatus {
    /// Returns `true` when the status admits no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Storage representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Void => "void",
            Self::Refunded => "refunded",
        }
    }

    /// Maps a non-active status to the redemption outcome a scan of such a
    /// ticket produces. Returns `None` for [`TicketStatus::Active`], which is
    /// not a rejection.
    #[must_use]
    pub const fn rejection_outcome(&self) -> Option<RedemptionOutcome> {
        match self {
            Self::Active => None,
            Self::Used => Some(RedemptionOutcome::AlreadyUsed),
            Self::Void => Some(RedemptionOutcome::Void),
            Self::Refunded => Some(RedemptionOutcome::Refunded),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            "void" => Ok(Self::Void),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

/// One admission right, minted by the Issuance Engine and consumed (at most
/// once) by the Redemption Engine. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique scannable code (primary key).
    pub code: TicketCode,
    /// Event this ticket admits to.
    pub event_ref: String,
    /// Buyer identity that owns the ticket.
    pub owner: String,
    /// Checkout session the ticket was minted for.
    pub session_id: String,
    /// Unit index within the session (`0..quantity`). Together with
    /// `session_id` this forms the idempotency key for minting.
    pub seq: i32,
    /// Current lifecycle status.
    pub status: TicketStatus,
    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,
    /// Start of the validity window, if any.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window, if any.
    pub valid_until: Option<DateTime<Utc>>,
    /// When the ticket was redeemed, if it has been.
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Gate that redeemed the ticket, if it has been.
    pub redeemed_by: Option<String>,
}

impl Ticket {
    /// Creates a fresh active ticket for one unit of a paid session.
    #[must_use]
    pub fn mint(
        code: TicketCode,
        event_ref: &str,
        owner: &str,
        session_id: &str,
        seq: i32,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            event_ref: event_ref.to_string(),
            owner: owner.to_string(),
            session_id: session_id.to_string(),
            seq,
            status: TicketStatus::Active,
            issued_at,
            valid_from: None,
            valid_until: None,
            redeemed_at: None,
            redeemed_by: None,
        }
    }

    /// Sets the optional validity window, consuming and returning `self`.
    #[must_use]
    pub fn with_validity(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }
}
