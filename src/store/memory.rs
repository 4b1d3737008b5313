//! In-process memory backend.
//!
//! Backs unit tests and local development. A single `RwLock` over the whole
//! dataset makes every primitive atomic, which is all the engines require:
//! minting dedupes on the `(session_id, seq)` key inside one write lock, and
//! redemption's compare-and-set runs under the same lock. Matches the
//! Postgres backend's semantics primitive-for-primitive.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::PurchaseUpsert;
use crate::domain::{
    EventRecord, Purchase, RedemptionAttempt, Ticket, TicketStatus,
};
use crate::error::GateError;

#[derive(Debug, Default)]
struct MemoryInner {
    /// Tickets keyed by code.
    tickets: HashMap<String, Ticket>,
    /// Occupied `(session_id, seq)` unit slots; the minting idempotency key.
    unit_slots: HashSet<(String, i32)>,
    /// Purchases keyed by session id.
    purchases: HashMap<String, Purchase>,
    /// Append-only audit trail.
    attempts: Vec<RedemptionAttempt>,
    /// Dedup ledger keyed by external event id.
    events: HashMap<String, EventRecord>,
}

/// Memory-backed store.
///
/// Cloning is cheap and shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`super::Store::insert_ticket`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] when the generated code itself collides
    /// with an existing ticket.
    pub async fn insert_ticket(&self, ticket: &Ticket) -> Result<bool, GateError> {
        let mut inner = self.inner.write().await;
        let slot = (ticket.session_id.clone(), ticket.seq);
        if inner.unit_slots.contains(&slot) {
            return Ok(false);
        }
        let code = ticket.code.as_str().to_string();
        if inner.tickets.contains_key(&code) {
            return Err(GateError::Store(format!(
                "ticket code collision: {code}"
            )));
        }
        inner.unit_slots.insert(slot);
        inner.tickets.insert(code, ticket.clone());
        Ok(true)
    }

    /// See [`super::Store::ticket_by_code`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, GateError> {
        let inner = self.inner.read().await;
        Ok(inner.tickets.get(code).cloned())
    }

    /// See [`super::Store::tickets_by_session`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn tickets_by_session(&self, session_id: &str) -> Result<Vec<Ticket>, GateError> {
        let inner = self.inner.read().await;
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.seq);
        Ok(tickets)
    }

    /// See [`super::Store::tickets_by_owner`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn tickets_by_owner(
        &self,
        owner: &str,
        limit: i64,
    ) -> Result<Vec<Ticket>, GateError> {
        let inner = self.inner.read().await;
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        tickets.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(tickets)
    }

    /// See [`super::Store::redeem_and_log`].
    ///
    /// Both writes happen under one write lock, so a consumed ticket always
    /// has its winning scan in the audit trail.
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn redeem_and_log(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<Option<Ticket>, GateError> {
        let mut inner = self.inner.write().await;
        let Some(ticket) = inner.tickets.get_mut(&attempt.ticket_code) else {
            return Ok(None);
        };
        if ticket.status != TicketStatus::Active {
            return Ok(None);
        }
        ticket.status = TicketStatus::Used;
        ticket.redeemed_at = Some(attempt.attempted_at);
        ticket.redeemed_by = Some(attempt.gate_id.clone());
        let updated = ticket.clone();
        inner.attempts.push(attempt.clone());
        Ok(Some(updated))
    }

    /// See [`super::Store::mark_ticket`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn mark_ticket(
        &self,
        code: &str,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, GateError> {
        let mut inner = self.inner.write().await;
        let Some(ticket) = inner.tickets.get_mut(code) else {
            return Ok(None);
        };
        if ticket.status != TicketStatus::Active {
            return Ok(None);
        }
        ticket.status = status;
        Ok(Some(ticket.clone()))
    }

    /// See [`super::Store::upsert_purchase`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn upsert_purchase(&self, up: &PurchaseUpsert) -> Result<Purchase, GateError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.purchases.get_mut(&up.session_id) {
            existing.event_ref.clone_from(&up.event_ref);
            existing.owner.clone_from(&up.owner);
            existing.amount_total = up.amount_total;
            existing.currency.clone_from(&up.currency);
            existing.payment_status = up.payment_status;
            for code in &up.ticket_codes {
                if !existing.ticket_codes.contains(code) {
                    existing.ticket_codes.push(code.clone());
                }
            }
            return Ok(existing.clone());
        }
        let purchase = Purchase {
            session_id: up.session_id.clone(),
            event_ref: up.event_ref.clone(),
            owner: up.owner.clone(),
            amount_total: up.amount_total,
            currency: up.currency.clone(),
            payment_status: up.payment_status,
            ticket_codes: dedup_preserving_order(&up.ticket_codes),
            created_at: up.created_at,
        };
        inner
            .purchases
            .insert(up.session_id.clone(), purchase.clone());
        Ok(purchase)
    }

    /// See [`super::Store::purchase_by_session`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn purchase_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Purchase>, GateError> {
        let inner = self.inner.read().await;
        Ok(inner.purchases.get(session_id).cloned())
    }

    /// See [`super::Store::append_attempt`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn append_attempt(&self, attempt: &RedemptionAttempt) -> Result<(), GateError> {
        let mut inner = self.inner.write().await;
        inner.attempts.push(attempt.clone());
        Ok(())
    }

    /// See [`super::Store::attempts_by_code`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn attempts_by_code(
        &self,
        code: &str,
    ) -> Result<Vec<RedemptionAttempt>, GateError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<RedemptionAttempt> = inner
            .attempts
            .iter()
            .filter(|a| a.ticket_code == code)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.attempted_at.cmp(&b.attempted_at));
        Ok(rows)
    }

    /// See [`super::Store::record_event`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn record_event(&self, record: &EventRecord) -> Result<bool, GateError> {
        let mut inner = self.inner.write().await;
        if inner.events.contains_key(&record.event_id) {
            return Ok(false);
        }
        inner
            .events
            .insert(record.event_id.clone(), record.clone());
        Ok(true)
    }

    /// See [`super::Store::recent_events`].
    ///
    /// # Errors
    ///
    /// Infallible for this backend.
    pub async fn recent_events(&self, limit: i64) -> Result<Vec<EventRecord>, GateError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<EventRecord> = inner.events.values().cloned().collect();
        rows.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}

fn dedup_preserving_order(codes: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(codes.len());
    for code in codes {
        if seen.insert(code.clone()) {
            out.push(code.clone());
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{PaymentStatus, RedemptionOutcome, TicketCode};

    fn ticket(session: &str, seq: i32) -> Ticket {
        Ticket::mint(
            TicketCode::generate(),
            "rodeo-2026",
            "user_1",
            session,
            seq,
            Utc::now(),
        )
    }

    fn winning_scan(code: &str, gate: &str) -> RedemptionAttempt {
        RedemptionAttempt::record(code, gate, Utc::now(), None, None, RedemptionOutcome::Ok)
    }

    #[tokio::test]
    async fn insert_ticket_dedupes_on_unit_slot() {
        let store = MemoryStore::new();
        let first = ticket("cs_1", 0);
        let rival = ticket("cs_1", 0);

        assert!(matches!(store.insert_ticket(&first).await, Ok(true)));
        assert!(matches!(store.insert_ticket(&rival).await, Ok(false)));

        let tickets = store.tickets_by_session("cs_1").await;
        let Ok(tickets) = tickets else {
            panic!("lookup failed");
        };
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets.first().map(|t| t.code.clone()), Some(first.code));
    }

    #[tokio::test]
    async fn redeem_and_log_consumes_once_and_records_the_winning_scan() {
        let store = MemoryStore::new();
        let t = ticket("cs_1", 0);
        let code = t.code.as_str().to_string();
        let Ok(true) = store.insert_ticket(&t).await else {
            panic!("insert failed");
        };

        let won = store.redeem_and_log(&winning_scan(&code, "gate_1")).await;
        let Ok(Some(updated)) = won else {
            panic!("first redemption must win");
        };
        assert_eq!(updated.status, TicketStatus::Used);
        assert_eq!(updated.redeemed_by.as_deref(), Some("gate_1"));

        // The consumed ticket and its audit row are one write: the trail
        // already holds the winning scan.
        let attempts = store.attempts_by_code(&code).await;
        let Ok(attempts) = attempts else {
            panic!("audit lookup failed");
        };
        assert_eq!(attempts.len(), 1);
        assert_eq!(
            attempts.first().map(|a| a.outcome),
            Some(RedemptionOutcome::Ok)
        );

        // A lost compare-and-set writes nothing at all.
        let lost = store.redeem_and_log(&winning_scan(&code, "gate_2")).await;
        assert!(matches!(lost, Ok(None)));
        let attempts = store.attempts_by_code(&code).await;
        assert!(matches!(attempts, Ok(rows) if rows.len() == 1));
    }

    #[tokio::test]
    async fn mark_ticket_only_leaves_active() {
        let store = MemoryStore::new();
        let t = ticket("cs_1", 0);
        let code = t.code.as_str().to_string();
        let Ok(true) = store.insert_ticket(&t).await else {
            panic!("insert failed");
        };

        let voided = store.mark_ticket(&code, TicketStatus::Void).await;
        assert!(matches!(voided, Ok(Some(_))));

        // Terminal states admit no further transitions.
        let again = store.mark_ticket(&code, TicketStatus::Refunded).await;
        assert!(matches!(again, Ok(None)));
        let redeemed = store.redeem_and_log(&winning_scan(&code, "gate_1")).await;
        assert!(matches!(redeemed, Ok(None)));
    }

    #[tokio::test]
    async fn upsert_purchase_merges_codes_without_shrinking() {
        let store = MemoryStore::new();
        let base = PurchaseUpsert {
            session_id: "cs_1".to_string(),
            event_ref: "rodeo-2026".to_string(),
            owner: "user_1".to_string(),
            amount_total: 8500,
            currency: "usd".to_string(),
            payment_status: PaymentStatus::Paid,
            ticket_codes: vec!["tkt_a".to_string(), "tkt_b".to_string()],
            created_at: Utc::now(),
        };
        let Ok(first) = store.upsert_purchase(&base).await else {
            panic!("upsert failed");
        };
        assert_eq!(first.ticket_codes, vec!["tkt_a", "tkt_b"]);

        let merge = PurchaseUpsert {
            ticket_codes: vec!["tkt_b".to_string(), "tkt_c".to_string()],
            ..base
        };
        let Ok(second) = store.upsert_purchase(&merge).await else {
            panic!("merge failed");
        };
        assert_eq!(second.ticket_codes, vec!["tkt_a", "tkt_b", "tkt_c"]);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn attempts_are_append_only_per_code() {
        let store = MemoryStore::new();
        for outcome in [RedemptionOutcome::Invalid, RedemptionOutcome::Invalid] {
            let row = RedemptionAttempt::record(
                "tkt_missing",
                "gate_1",
                Utc::now(),
                None,
                None,
                outcome,
            );
            let Ok(()) = store.append_attempt(&row).await else {
                panic!("append failed");
            };
        }
        let rows = store.attempts_by_code("tkt_missing").await;
        let Ok(rows) = rows else {
            panic!("lookup failed");
        };
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn record_event_detects_duplicates() {
        let store = MemoryStore::new();
        let record = EventRecord {
            event_id: "evt_1".to_string(),
            event_type: "checkout.completed".to_string(),
            received_at: Utc::now(),
            payload_digest: "00".repeat(32),
        };
        assert!(matches!(store.record_event(&record).await, Ok(true)));
        assert!(matches!(store.record_event(&record).await, Ok(false)));
    }

    #[tokio::test]
    async fn recent_events_returns_newest_first_within_limit() {
        let store = MemoryStore::new();
        for (id, offset_secs) in [("evt_1", 10), ("evt_2", 20), ("evt_3", 30)] {
            let record = EventRecord {
                event_id: id.to_string(),
                event_type: "checkout.completed".to_string(),
                received_at: Utc::now() + chrono::Duration::seconds(offset_secs),
                payload_digest: "00".repeat(32),
            };
            let Ok(true) = store.record_event(&record).await else {
                panic!("record failed");
            };
        }

        let rows = store.recent_events(2).await;
        let Ok(rows) = rows else {
            panic!("ledger read failed");
        };
        let ids: Vec<&str> = rows.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["evt_3", "evt_2"]);
    }
}
