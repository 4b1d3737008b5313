//! Inbound payment-completion events and the delivery dedup ledger.
//!
//! The payment collaborator delivers events at-least-once: the same event may
//! arrive twice, concurrently, or days apart. Two defenses are layered here:
//! a strict tagged parse that fails closed on unrecognized shapes, and an
//! [`EventRecord`] ledger that recognizes an event id it has already seen.
//! The Issuance Engine stays correct even when the ledger is bypassed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Externally delivered event, parsed strictly at the trust boundary.
///
/// The discriminant is the `type` field; unknown types and unknown payload
/// fields are rejected before any business logic runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum CheckoutEvent {
    /// A checkout session completed with payment captured.
    #[serde(rename = "checkout.completed")]
    Completed(CheckoutCompleted),
}

impl CheckoutEvent {
    /// Parses an event from a raw delivery body, failing closed on anything
    /// that is not an exact match for a known shape.
    ///
    /// # Errors
    ///
    /// Returns the serde error message when the body is not valid JSON, the
    /// `type` tag is unrecognized, a required field is missing, or an
    /// unexpected field is present.
    pub fn parse(body: &str) -> Result<Self, String> {
        serde_json::from_str(body).map_err(|e| e.to_string())
    }

    /// Event type discriminator string, as stored in the ledger.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Completed(_) => "checkout.completed",
        }
    }

    /// External event id used for ledger dedup.
    #[must_use]
    pub fn event_id(&self) -> &str {
        match self {
            Self::Completed(e) => &e.event_id,
        }
    }
}

/// Payload of a completed-checkout event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutCompleted {
    /// External event identifier (stable across redeliveries).
    pub event_id: String,
    /// External payment-session identifier.
    pub session_id: String,
    /// Buyer identity the session was opened for.
    pub buyer: String,
    /// Event the purchase admits to.
    pub event_ref: String,
    /// Number of admission rights purchased.
    pub quantity: i64,
    /// Total amount in minor currency units.
    pub amount_total: i64,
    /// ISO currency code.
    pub currency: String,
    /// When the checkout completed at the provider.
    pub occurred_at: DateTime<Utc>,
}

/// Ledger row recording one externally delivered event id.
///
/// Unique per event id: a second delivery of the same id is recognized and
/// dropped before it reaches the Issuance Engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// External event id (unique key).
    pub event_id: String,
    /// Event type discriminator.
    pub event_type: String,
    /// Arrival timestamp at this service.
    pub received_at: DateTime<Utc>,
    /// Hex SHA-256 of the raw delivery body.
    pub payload_digest: String,
}

/// Hex SHA-256 digest of a raw delivery body, stored alongside the ledger
/// row so a replayed id with a different payload can be spotted after the
/// fact.
#[must_use]
pub fn payload_digest(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn completed_body() -> String {
        serde_json::json!({
            "type": "checkout.completed",
            "event_id": "evt_1",
            "session_id": "cs_1",
            "buyer": "user_1",
            "event_ref": "rodeo-2026",
            "quantity": 2,
            "amount_total": 8500,
            "currency": "usd",
            "occurred_at": "2026-08-01T18:00:00Z"
        })
        .to_string()
    }

    #[test]
    fn parses_completed_event() {
        let event = CheckoutEvent::parse(&completed_body());
        let Ok(CheckoutEvent::Completed(e)) = event else {
            panic!("expected completed event");
        };
        assert_eq!(e.event_id, "evt_1");
        assert_eq!(e.session_id, "cs_1");
        assert_eq!(e.quantity, 2);
        assert_eq!(e.amount_total, 8500);
    }

    #[test]
    fn unknown_event_type_fails_closed() {
        let body = serde_json::json!({
            "type": "checkout.expired",
            "event_id": "evt_2",
            "session_id": "cs_2"
        })
        .to_string();
        assert!(CheckoutEvent::parse(&body).is_err());
    }

    #[test]
    fn unknown_field_fails_closed() {
        let mut value: serde_json::Value = match serde_json::from_str(&completed_body()) {
            Ok(v) => v,
            Err(e) => panic!("fixture must parse: {e}"),
        };
        if let Some(map) = value.as_object_mut() {
            map.insert("surprise".to_string(), serde_json::json!(true));
        }
        assert!(CheckoutEvent::parse(&value.to_string()).is_err());
    }

    #[test]
    fn missing_required_field_fails_closed() {
        let body = serde_json::json!({
            "type": "checkout.completed",
            "event_id": "evt_3"
        })
        .to_string();
        assert!(CheckoutEvent::parse(&body).is_err());
    }

    #[test]
    fn digest_is_stable_hex_sha256() {
        let a = payload_digest(b"hello");
        let b = payload_digest(b"hello");
        let c = payload_digest(b"hello!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
