//! High-entropy ticket code generation.
//!
//! [`TicketCode`] is a newtype wrapper around the opaque string that a gate
//! scanner reads back from a QR code. Codes are the unique identity of a
//! ticket, so they are drawn from a CSPRNG: guessable codes would let an
//! attacker redeem admission rights they never bought.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Number of random bytes per code (128 bits of entropy).
const CODE_BYTES: usize = 16;

/// Prefix identifying a ticket code in logs and scanned payloads.
const CODE_PREFIX: &str = "tkt_";

/// Unique, unguessable identifier for a single admission right.
///
/// Generated once at issuance and immutable thereafter. Used as the primary
/// key of the tickets table, the QR payload, and the redemption lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketCode(String);

impl TicketCode {
    /// Generates a fresh code: `tkt_` followed by 32 hex characters drawn
    /// from the operating system CSPRNG.
    ///
    /// With 128 bits of entropy per code, the collision probability across
    /// any realistic number of issued tickets is cryptographically
    /// negligible, so issuance inserts codes without a retry loop.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; CODE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("{CODE_PREFIX}{hex}"))
    }

    /// Wraps an existing code string (e.g. loaded from the store or scanned
    /// at a gate). No validation is performed: unknown codes are a business
    /// outcome (`invalid`), not a parse error.
    #[must_use]
    pub fn from_string(code: String) -> Self {
        Self(code)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TicketCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl From<TicketCode> for String {
    fn from(code: TicketCode) -> Self {
        code.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_prefixed_hex() {
        let code = TicketCode::generate();
        let s = code.as_str();
        assert!(s.starts_with(CODE_PREFIX));
        assert_eq!(s.len(), CODE_PREFIX.len() + CODE_BYTES * 2);
        assert!(
            s.trim_start_matches(CODE_PREFIX)
                .chars()
                .all(|c| c.is_ascii_hexdigit())
        );
    }

    #[test]
    fn generate_produces_unique_codes() {
        let a = TicketCode::generate();
        let b = TicketCode::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn serde_is_transparent() {
        let code = TicketCode::from_string("tkt_abc123".to_string());
        let json = serde_json::to_string(&code).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"tkt_abc123\"");
        let back: Option<TicketCode> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(code));
    }
}
