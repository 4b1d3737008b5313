//! Caller identity and shared-secret extraction.
//!
//! Authentication itself is delegated to the identity collaborator fronting
//! this service: it validates the user's session and injects `x-caller-id`
//! and `x-caller-roles` headers before the request reaches us. This module
//! only reads those headers and enforces role membership.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::error::GateError;

/// Role a caller must hold to redeem tickets at a gate.
pub const GATE_ROLE: &str = "gate";

/// Authenticated caller identity, extracted from trusted proxy headers.
///
/// Rejects with 401 when no identity header is present.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Stable caller identifier (the identity collaborator's subject).
    pub id: String,
    /// Role memberships granted to the caller.
    pub roles: Vec<String>,
}

impl Caller {
    /// Returns `true` when the caller holds the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Enforces role membership.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Forbidden`] when the caller lacks the role.
    pub fn require_role(&self, role: &str) -> Result<(), GateError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(GateError::Forbidden(role.to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-caller-id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(GateError::Unauthorized)?
            .to_string();

        let roles = parts
            .headers
            .get("x-caller-roles")
            .and_then(|v| v.to_str().ok())
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { id, roles })
    }
}

/// Extracts the bearer token from an `Authorization` header.
///
/// # Errors
///
/// Returns [`GateError::Unauthorized`] when the header is missing or not a
/// bearer credential.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GateError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(GateError::Unauthorized)
}
