//! Store layer: transactional primitives behind a backend switch.
//!
//! The two engines never talk to a database directly; they use the small set
//! of primitives on [`Store`]. Each primitive is individually atomic, and the
//! two idempotency-critical ones are conditional writes:
//!
//! - [`Store::insert_ticket`] is insert-if-absent on the `(session_id, seq)`
//!   unique key, so concurrent duplicate issuance of the same unit index
//!   resolves to exactly one winner.
//! - [`Store::redeem_and_log`] is a compare-and-set on `status = 'active'`
//!   coupled with the audit append in one transaction, so at most one scan of
//!   a code ever succeeds and a consumed ticket always has its winning scan
//!   on record.
//!
//! [`PostgresStore`] is the production backend; [`MemoryStore`] backs tests
//! and local development (`STORE_BACKEND=memory`).

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};

use crate::domain::{
    EventRecord, PaymentStatus, Purchase, RedemptionAttempt, Ticket, TicketStatus,
};
use crate::error::GateError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Input to [`Store::upsert_purchase`]: descriptive session data plus the
/// codes minted so far. On conflict the code list is merged as an
/// order-preserving set union — existing codes are never removed.
#[derive(Debug, Clone)]
pub struct PurchaseUpsert {
    /// External payment-session identifier (unique key).
    pub session_id: String,
    /// Event the purchase admits to.
    pub event_ref: String,
    /// Buyer identity.
    pub owner: String,
    /// Total amount in minor currency units.
    pub amount_total: i64,
    /// ISO currency code.
    pub currency: String,
    /// Payment status to record.
    pub payment_status: PaymentStatus,
    /// Ticket codes to merge into the purchase.
    pub ticket_codes: Vec<String>,
    /// Creation timestamp used when the row does not exist yet.
    pub created_at: DateTime<Utc>,
}

/// Store backend selected at startup.
#[derive(Debug, Clone)]
pub enum Store {
    /// PostgreSQL via `sqlx`.
    Postgres(PostgresStore),
    /// In-process memory store.
    Memory(MemoryStore),
}

impl Store {
    /// Inserts a ticket if no ticket exists for its `(session_id, seq)` key.
    /// Returns `true` when this call inserted the row.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn insert_ticket(&self, ticket: &Ticket) -> Result<bool, GateError> {
        match self {
            Self::Postgres(s) => s.insert_ticket(ticket).await,
            Self::Memory(s) => s.insert_ticket(ticket).await,
        }
    }

    /// Looks up a ticket by its unique code.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, GateError> {
        match self {
            Self::Postgres(s) => s.ticket_by_code(code).await,
            Self::Memory(s) => s.ticket_by_code(code).await,
        }
    }

    /// Returns every ticket minted for a session, ordered by unit index.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn tickets_by_session(&self, session_id: &str) -> Result<Vec<Ticket>, GateError> {
        match self {
            Self::Postgres(s) => s.tickets_by_session(session_id).await,
            Self::Memory(s) => s.tickets_by_session(session_id).await,
        }
    }

    /// Returns the most recently issued tickets owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn tickets_by_owner(
        &self,
        owner: &str,
        limit: i64,
    ) -> Result<Vec<Ticket>, GateError> {
        match self {
            Self::Postgres(s) => s.tickets_by_owner(owner, limit).await,
            Self::Memory(s) => s.tickets_by_owner(owner, limit).await,
        }
    }

    /// Atomically transitions a ticket from `active` to `used` — stamping
    /// the redemption time and gate from `attempt` — and appends `attempt`
    /// to the audit trail in the same transaction. Returns the updated
    /// ticket only to the one caller that won the transition; on a lost
    /// compare-and-set (`None`) nothing is written and the caller records
    /// the rejection separately.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure; neither write is
    /// visible in that case.
    pub async fn redeem_and_log(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<Option<Ticket>, GateError> {
        match self {
            Self::Postgres(s) => s.redeem_and_log(attempt).await,
            Self::Memory(s) => s.redeem_and_log(attempt).await,
        }
    }

    /// Administrative status change, `active → void|refunded` only. Returns
    /// the updated ticket, or `None` when the ticket does not exist or has
    /// already left `active`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure, or
    /// [`GateError::InvalidRequest`] when the target status is not terminal.
    pub async fn mark_ticket(
        &self,
        code: &str,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, GateError> {
        if !status.is_terminal() {
            return Err(GateError::InvalidRequest(
                "tickets can only be marked with a terminal status".to_string(),
            ));
        }
        match self {
            Self::Postgres(s) => s.mark_ticket(code, status).await,
            Self::Memory(s) => s.mark_ticket(code, status).await,
        }
    }

    /// Inserts or merges the purchase row for a session and returns the row
    /// as stored afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn upsert_purchase(&self, up: &PurchaseUpsert) -> Result<Purchase, GateError> {
        match self {
            Self::Postgres(s) => s.upsert_purchase(up).await,
            Self::Memory(s) => s.upsert_purchase(up).await,
        }
    }

    /// Looks up a purchase by its unique session id.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn purchase_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Purchase>, GateError> {
        match self {
            Self::Postgres(s) => s.purchase_by_session(session_id).await,
            Self::Memory(s) => s.purchase_by_session(session_id).await,
        }
    }

    /// Appends one row to the redemption audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn append_attempt(&self, attempt: &RedemptionAttempt) -> Result<(), GateError> {
        match self {
            Self::Postgres(s) => s.append_attempt(attempt).await,
            Self::Memory(s) => s.append_attempt(attempt).await,
        }
    }

    /// Returns every audit row for a scanned code, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn attempts_by_code(
        &self,
        code: &str,
    ) -> Result<Vec<RedemptionAttempt>, GateError> {
        match self {
            Self::Postgres(s) => s.attempts_by_code(code).await,
            Self::Memory(s) => s.attempts_by_code(code).await,
        }
    }

    /// Records an externally delivered event id in the dedup ledger.
    /// Returns `false` when the id had already been recorded (duplicate
    /// delivery).
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn record_event(&self, record: &EventRecord) -> Result<bool, GateError> {
        match self {
            Self::Postgres(s) => s.record_event(record).await,
            Self::Memory(s) => s.record_event(record).await,
        }
    }

    /// Returns the most recently received ledger rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on backend failure.
    pub async fn recent_events(&self, limit: i64) -> Result<Vec<EventRecord>, GateError> {
        match self {
            Self::Postgres(s) => s.recent_events(limit).await,
            Self::Memory(s) => s.recent_events(limit).await,
        }
    }
}
