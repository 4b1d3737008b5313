//! Ticket service: issuance idempotency and one-time redemption.
//!
//! [`TicketService`] owns the two pieces of original logic in this system.
//!
//! **Issuance** must mint exactly `quantity` tickets per checkout session no
//! matter how many times the payment collaborator redelivers the completion
//! event. The idempotency key is `(session_id, seq)`: each admission right is
//! unit `seq` of its session, and the store's insert-if-absent on that key
//! makes even concurrent duplicate deliveries converge on one ticket per
//! unit.
//!
//! **Redemption** must consume a ticket at most once across any number of
//! concurrent gate scans. The store's compare-and-set on `status = 'active'`
//! admits exactly one winner; losers re-evaluate from the lookup and surface
//! the ticket's terminal state. Every attempt — including invalid codes —
//! appends one audit row.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::checkout::payload_digest;
use crate::domain::{
    CheckoutCompleted, CheckoutEvent, EventRecord, PaymentStatus, Purchase, RedemptionAttempt,
    RedemptionOutcome, Ticket, TicketCode, TicketStatus,
};
use crate::error::GateError;
use crate::store::{PurchaseUpsert, Store};

/// How many times a redemption re-evaluates after losing the compare-and-set
/// before reporting a retryable conflict. A loss means the ticket changed
/// between lookup and write, which a fresh lookup resolves deterministically,
/// so the budget is rarely consumed past the first iteration.
const REDEEM_RETRY_BUDGET: usize = 3;

/// Default and maximum page sizes for listing endpoints.
const LIST_DEFAULT: i64 = 10;
const LIST_MAX: i64 = 100;

/// Everything the Issuance Engine needs from a verified completed-checkout
/// event.
#[derive(Debug, Clone)]
pub struct IssueCommand {
    /// External payment-session identifier.
    pub session_id: String,
    /// Event the purchase admits to.
    pub event_ref: String,
    /// Buyer identity.
    pub buyer: String,
    /// Number of admission rights purchased.
    pub quantity: i64,
    /// Total amount in minor currency units.
    pub amount_total: i64,
    /// ISO currency code.
    pub currency: String,
    /// When the checkout completed at the provider.
    pub occurred_at: DateTime<Utc>,
    /// Optional validity window start for the minted tickets.
    pub valid_from: Option<DateTime<Utc>>,
    /// Optional validity window end for the minted tickets.
    pub valid_until: Option<DateTime<Utc>>,
}

impl From<CheckoutCompleted> for IssueCommand {
    fn from(e: CheckoutCompleted) -> Self {
        Self {
            session_id: e.session_id,
            event_ref: e.event_ref,
            buyer: e.buyer,
            quantity: e.quantity,
            amount_total: e.amount_total,
            currency: e.currency,
            occurred_at: e.occurred_at,
            valid_from: None,
            valid_until: None,
        }
    }
}

/// Result of one issuance call.
#[derive(Debug, Clone, Serialize)]
pub struct IssueReceipt {
    /// Session the tickets belong to.
    pub session_id: String,
    /// Full ordered code set for the session: pre-existing plus newly minted.
    pub ticket_codes: Vec<String>,
    /// How many tickets this call actually minted.
    pub minted: u32,
}

/// Result of ingesting one webhook delivery.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    /// `true` when the ledger had already seen this event id and the
    /// delivery was dropped before issuance.
    pub duplicate: bool,
    /// Issuance result for a fresh delivery.
    pub issue: Option<IssueReceipt>,
}

/// One scan at a gate.
#[derive(Debug, Clone)]
pub struct RedeemCommand {
    /// Scanned QR payload.
    pub ticket_code: String,
    /// Redeeming gate or kiosk.
    pub gate_id: String,
    /// Best-effort network origin for the audit trail.
    pub origin: Option<String>,
    /// Best-effort client descriptor for the audit trail.
    pub client: Option<String>,
}

/// Result of one redemption call. Rejections are results, not errors.
#[derive(Debug, Clone)]
pub struct RedemptionReceipt {
    /// What the scan produced.
    pub outcome: RedemptionOutcome,
    /// The ticket as it stands after the call; `None` for unknown codes.
    pub ticket: Option<Ticket>,
}

/// Minimal public projection of a ticket for gate validators. Deliberately
/// excludes the owner and all financial fields.
#[derive(Debug, Clone, Serialize)]
pub struct TicketSummary {
    /// Scannable code.
    pub code: String,
    /// Event the ticket admits to.
    pub event_ref: String,
    /// Current status.
    pub status: TicketStatus,
    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,
}

impl From<&Ticket> for TicketSummary {
    fn from(t: &Ticket) -> Self {
        Self {
            code: t.code.as_str().to_string(),
            event_ref: t.event_ref.clone(),
            status: t.status,
            issued_at: t.issued_at,
        }
    }
}

/// Orchestration layer for issuance, redemption, and scoped reads.
///
/// Holds the store plus immutable configuration (the shared ingest secret);
/// no business state lives in the process.
#[derive(Debug, Clone)]
pub struct TicketService {
    store: Store,
    ingest_token: String,
}

impl TicketService {
    /// Creates a new `TicketService`.
    #[must_use]
    pub fn new(store: Store, ingest_token: String) -> Self {
        Self {
            store,
            ingest_token,
        }
    }

    /// Returns a reference to the underlying [`Store`].
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn check_token(&self, token: &str) -> Result<(), GateError> {
        if token != self.ingest_token {
            return Err(GateError::Unauthorized);
        }
        Ok(())
    }

    /// Ingests one raw webhook delivery: strict parse, ledger dedup, then
    /// issuance. A duplicate event id is dropped before reaching the
    /// Issuance Engine; issuance itself stays idempotent even if the ledger
    /// is bypassed, so redelivery is safe either way.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Unauthorized`] on a wrong token,
    /// [`GateError::MalformedEvent`] when the body does not match a known
    /// event shape, and issuance or store errors otherwise.
    pub async fn ingest(&self, token: &str, raw_body: &str) -> Result<IngestReceipt, GateError> {
        self.check_token(token)?;

        let event = CheckoutEvent::parse(raw_body).map_err(GateError::MalformedEvent)?;
        let record = EventRecord {
            event_id: event.event_id().to_string(),
            event_type: event.event_type().to_string(),
            received_at: Utc::now(),
            payload_digest: payload_digest(raw_body.as_bytes()),
        };

        if !self.store.record_event(&record).await? {
            tracing::info!(event_id = %record.event_id, "duplicate delivery ignored");
            return Ok(IngestReceipt {
                duplicate: true,
                issue: None,
            });
        }

        let CheckoutEvent::Completed(completed) = event;
        tracing::info!(
            event_id = %record.event_id,
            session_id = %completed.session_id,
            quantity = completed.quantity,
            "checkout completed event accepted"
        );
        let receipt = self.issue(token, &IssueCommand::from(completed)).await?;
        Ok(IngestReceipt {
            duplicate: false,
            issue: Some(receipt),
        })
    }

    /// The Issuance Engine: ensures exactly `quantity` tickets exist for the
    /// session, minting only the missing unit indices.
    ///
    /// Calling twice with identical arguments mints nothing the second time
    /// and returns the same code set. A larger quantity tops up the
    /// difference; a smaller one never removes previously granted admission
    /// rights.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Unauthorized`] on a wrong token,
    /// [`GateError::InvalidRequest`] on missing fields,
    /// [`GateError::InvalidQuantity`] when `quantity < 1`, and
    /// [`GateError::Store`] on store failure.
    pub async fn issue(&self, token: &str, cmd: &IssueCommand) -> Result<IssueReceipt, GateError> {
        self.check_token(token)?;

        if cmd.session_id.trim().is_empty() || cmd.buyer.trim().is_empty() {
            return Err(GateError::InvalidRequest(
                "session_id and buyer are required".to_string(),
            ));
        }
        if cmd.quantity < 1 {
            return Err(GateError::InvalidQuantity(cmd.quantity));
        }
        let quantity =
            i32::try_from(cmd.quantity).map_err(|_| GateError::InvalidQuantity(cmd.quantity))?;

        let existing = self.store.tickets_by_session(&cmd.session_id).await?;
        let taken: HashSet<i32> = existing.iter().map(|t| t.seq).collect();

        let mut minted = 0u32;
        for seq in 0..quantity {
            if taken.contains(&seq) {
                continue;
            }
            let ticket = Ticket::mint(
                TicketCode::generate(),
                &cmd.event_ref,
                &cmd.buyer,
                &cmd.session_id,
                seq,
                Utc::now(),
            )
            .with_validity(cmd.valid_from, cmd.valid_until);

            // A `false` here means a concurrent delivery minted this unit
            // between our read and this insert; its ticket stands.
            if self.store.insert_ticket(&ticket).await? {
                minted += 1;
            }
        }

        let tickets = self.store.tickets_by_session(&cmd.session_id).await?;
        let codes: Vec<String> = tickets
            .iter()
            .map(|t| t.code.as_str().to_string())
            .collect();

        let purchase = self
            .store
            .upsert_purchase(&PurchaseUpsert {
                session_id: cmd.session_id.clone(),
                event_ref: cmd.event_ref.clone(),
                owner: cmd.buyer.clone(),
                amount_total: cmd.amount_total,
                currency: cmd.currency.clone(),
                payment_status: PaymentStatus::Paid,
                ticket_codes: codes,
                created_at: cmd.occurred_at,
            })
            .await?;

        tracing::info!(
            session_id = %cmd.session_id,
            minted,
            total = purchase.ticket_codes.len(),
            "issuance complete"
        );

        Ok(IssueReceipt {
            session_id: cmd.session_id.clone(),
            ticket_codes: purchase.ticket_codes,
            minted,
        })
    }

    /// The Redemption Engine: lookup, branch on status, compare-and-set.
    ///
    /// At most one call per code ever observes `active` and wins the
    /// transition; all others surface the resulting terminal state. A lost
    /// compare-and-set re-evaluates from the lookup rather than blindly
    /// reapplying the write. Exactly one audit row is appended per call,
    /// whatever the outcome; the winning row is written in the same store
    /// transaction as the status change, so the admission can never happen
    /// without being recorded.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidRequest`] when the code or gate id is
    /// blank (no audit row: nothing meaningful was scanned),
    /// [`GateError::RedemptionConflict`] if the retry budget is exhausted,
    /// and [`GateError::Store`] on store failure.
    pub async fn redeem(&self, cmd: &RedeemCommand) -> Result<RedemptionReceipt, GateError> {
        let code = cmd.ticket_code.trim();
        let gate = cmd.gate_id.trim();
        if code.is_empty() || gate.is_empty() {
            return Err(GateError::InvalidRequest(
                "ticket_code and gate_id are required".to_string(),
            ));
        }

        for _ in 0..REDEEM_RETRY_BUDGET {
            let Some(ticket) = self.store.ticket_by_code(code).await? else {
                self.log_attempt(code, gate, cmd, RedemptionOutcome::Invalid)
                    .await?;
                tracing::warn!(ticket_code = %code, gate_id = %gate, "invalid code scanned");
                return Ok(RedemptionReceipt {
                    outcome: RedemptionOutcome::Invalid,
                    ticket: None,
                });
            };

            if let Some(outcome) = ticket.status.rejection_outcome() {
                self.log_attempt(code, gate, cmd, outcome).await?;
                tracing::info!(
                    ticket_code = %code,
                    gate_id = %gate,
                    outcome = %outcome,
                    "redemption rejected"
                );
                return Ok(RedemptionReceipt {
                    outcome,
                    ticket: Some(ticket),
                });
            }

            // The transition and its audit row are one store transaction:
            // a consumed ticket is never missing its winning scan.
            let attempt = RedemptionAttempt::record(
                code,
                gate,
                Utc::now(),
                cmd.origin.clone(),
                cmd.client.clone(),
                RedemptionOutcome::Ok,
            );
            if let Some(updated) = self.store.redeem_and_log(&attempt).await? {
                tracing::info!(ticket_code = %code, gate_id = %gate, "ticket redeemed");
                return Ok(RedemptionReceipt {
                    outcome: RedemptionOutcome::Ok,
                    ticket: Some(updated),
                });
            }
            // Lost the race between lookup and write; re-read and re-branch.
        }

        Err(GateError::RedemptionConflict(code.to_string()))
    }

    async fn log_attempt(
        &self,
        code: &str,
        gate: &str,
        cmd: &RedeemCommand,
        outcome: RedemptionOutcome,
    ) -> Result<(), GateError> {
        let attempt = RedemptionAttempt::record(
            code,
            gate,
            Utc::now(),
            cmd.origin.clone(),
            cmd.client.clone(),
            outcome,
        );
        self.store.append_attempt(&attempt).await
    }

    /// Read-only validator lookup: the minimal public projection of a
    /// ticket, or `None` for unknown codes.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on store failure.
    pub async fn validate(&self, code: &str) -> Result<Option<TicketSummary>, GateError> {
        let ticket = self.store.ticket_by_code(code).await?;
        Ok(ticket.as_ref().map(TicketSummary::from))
    }

    /// Buyer-scoped ticket listing, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on store failure.
    pub async fn tickets_for_owner(
        &self,
        owner: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Ticket>, GateError> {
        let limit = limit.unwrap_or(LIST_DEFAULT).clamp(1, LIST_MAX);
        self.store.tickets_by_owner(owner, limit).await
    }

    /// Operator view of the delivery ledger, newest first. Guarded by the
    /// same shared secret as the ingest surfaces.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Unauthorized`] on a wrong token and
    /// [`GateError::Store`] on store failure.
    pub async fn recent_events(
        &self,
        token: &str,
        limit: Option<i64>,
    ) -> Result<Vec<EventRecord>, GateError> {
        self.check_token(token)?;
        let limit = limit.unwrap_or(LIST_DEFAULT).clamp(1, LIST_MAX);
        self.store.recent_events(limit).await
    }

    /// Buyer-scoped purchase lookup. A purchase belonging to a different
    /// identity is reported absent, never leaked.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::PurchaseNotFound`] when no purchase is visible
    /// to the caller under this session id, and [`GateError::Store`] on
    /// store failure.
    pub async fn purchase_for_owner(
        &self,
        owner: &str,
        session_id: &str,
    ) -> Result<Purchase, GateError> {
        let purchase = self.store.purchase_by_session(session_id).await?;
        match purchase {
            Some(p) if p.owner == owner => Ok(p),
            _ => Err(GateError::PurchaseNotFound(session_id.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const TOKEN: &str = "sekrit";

    fn make_service() -> TicketService {
        TicketService::new(Store::Memory(MemoryStore::new()), TOKEN.to_string())
    }

    fn command(session: &str, quantity: i64) -> IssueCommand {
        IssueCommand {
            session_id: session.to_string(),
            event_ref: "rodeo-2026".to_string(),
            buyer: "user_1".to_string(),
            quantity,
            amount_total: 8500,
            currency: "usd".to_string(),
            occurred_at: Utc::now(),
            valid_from: None,
            valid_until: None,
        }
    }

    async fn issue_one(service: &TicketService, session: &str) -> String {
        let receipt = service.issue(TOKEN, &command(session, 1)).await;
        let Ok(receipt) = receipt else {
            panic!("issuance failed");
        };
        let Some(code) = receipt.ticket_codes.first() else {
            panic!("no ticket minted");
        };
        code.clone()
    }

    fn scan(code: &str, gate: &str) -> RedeemCommand {
        RedeemCommand {
            ticket_code: code.to_string(),
            gate_id: gate.to_string(),
            origin: Some("203.0.113.9".to_string()),
            client: Some("kiosk-scanner/1.0".to_string()),
        }
    }

    #[tokio::test]
    async fn issue_mints_requested_quantity_once() {
        let service = make_service();
        let cmd = command("cs_1", 2);

        let first = service.issue(TOKEN, &cmd).await;
        let Ok(first) = first else {
            panic!("first issue failed");
        };
        assert_eq!(first.minted, 2);
        assert_eq!(first.ticket_codes.len(), 2);

        let purchase = service.purchase_for_owner("user_1", "cs_1").await;
        let Ok(purchase) = purchase else {
            panic!("purchase missing");
        };
        assert_eq!(purchase.ticket_codes, first.ticket_codes);
        assert_eq!(purchase.payment_status, PaymentStatus::Paid);
        assert_eq!(purchase.amount_total, 8500);

        // Redelivery with identical arguments mints nothing and returns the
        // same code set.
        let second = service.issue(TOKEN, &cmd).await;
        let Ok(second) = second else {
            panic!("second issue failed");
        };
        assert_eq!(second.minted, 0);
        assert_eq!(second.ticket_codes, first.ticket_codes);
    }

    #[tokio::test]
    async fn issue_is_idempotent_across_many_redeliveries() {
        let service = make_service();
        let cmd = command("cs_n", 3);
        for _ in 0..5 {
            let Ok(_) = service.issue(TOKEN, &cmd).await else {
                panic!("issue failed");
            };
        }
        let tickets = service.store().tickets_by_session("cs_n").await;
        let Ok(tickets) = tickets else {
            panic!("lookup failed");
        };
        assert_eq!(tickets.len(), 3);
    }

    #[tokio::test]
    async fn issue_tops_up_but_never_shrinks() {
        let service = make_service();
        let Ok(first) = service.issue(TOKEN, &command("cs_2", 2)).await else {
            panic!("issue failed");
        };

        let Ok(topped) = service.issue(TOKEN, &command("cs_2", 4)).await else {
            panic!("top-up failed");
        };
        assert_eq!(topped.minted, 2);
        assert_eq!(topped.ticket_codes.len(), 4);
        assert_eq!(topped.ticket_codes.get(..2), first.ticket_codes.get(..));

        let Ok(shrunk) = service.issue(TOKEN, &command("cs_2", 1)).await else {
            panic!("shrink call failed");
        };
        assert_eq!(shrunk.minted, 0);
        assert_eq!(shrunk.ticket_codes.len(), 4);
    }

    #[tokio::test]
    async fn issue_rejects_bad_input() {
        let service = make_service();
        assert!(matches!(
            service.issue("wrong", &command("cs_3", 1)).await,
            Err(GateError::Unauthorized)
        ));
        assert!(matches!(
            service.issue(TOKEN, &command("cs_3", 0)).await,
            Err(GateError::InvalidQuantity(0))
        ));
        assert!(matches!(
            service.issue(TOKEN, &command("cs_3", -4)).await,
            Err(GateError::InvalidQuantity(-4))
        ));
        assert!(matches!(
            service.issue(TOKEN, &command("", 1)).await,
            Err(GateError::InvalidRequest(_))
        ));
        // Nothing reached the store.
        let tickets = service.store().tickets_by_session("cs_3").await;
        assert!(matches!(tickets, Ok(t) if t.is_empty()));
    }

    fn completed_body(event_id: &str, session_id: &str, quantity: i64) -> String {
        serde_json::json!({
            "type": "checkout.completed",
            "event_id": event_id,
            "session_id": session_id,
            "buyer": "user_1",
            "event_ref": "rodeo-2026",
            "quantity": quantity,
            "amount_total": 8500,
            "currency": "usd",
            "occurred_at": "2026-08-01T18:00:00Z"
        })
        .to_string()
    }

    #[tokio::test]
    async fn ingest_mints_and_filters_duplicate_event_ids() {
        let service = make_service();
        let body = completed_body("evt_1", "cs_4", 2);

        let first = service.ingest(TOKEN, &body).await;
        let Ok(first) = first else {
            panic!("ingest failed");
        };
        assert!(!first.duplicate);
        let Some(issue) = first.issue else {
            panic!("fresh ingest must issue");
        };
        assert_eq!(issue.minted, 2);

        let replay = service.ingest(TOKEN, &body).await;
        let Ok(replay) = replay else {
            panic!("replay failed");
        };
        assert!(replay.duplicate);
        assert!(replay.issue.is_none());

        // A distinct event id for the same session is not filtered by the
        // ledger, but issuance idempotency still mints nothing new.
        let retry_body = completed_body("evt_2", "cs_4", 2);
        let second = service.ingest(TOKEN, &retry_body).await;
        let Ok(second) = second else {
            panic!("second ingest failed");
        };
        assert!(!second.duplicate);
        assert_eq!(second.issue.map(|i| i.minted), Some(0));
    }

    #[tokio::test]
    async fn ingest_fails_closed_on_unknown_shapes() {
        let service = make_service();
        let body = serde_json::json!({
            "type": "checkout.completed",
            "event_id": "evt_x",
            "session_id": "cs_x",
            "buyer": "user_1",
            "event_ref": "rodeo-2026",
            "quantity": 1,
            "amount_total": 100,
            "currency": "usd",
            "occurred_at": "2026-08-01T18:00:00Z",
            "extra_field": "?"
        })
        .to_string();
        assert!(matches!(
            service.ingest(TOKEN, &body).await,
            Err(GateError::MalformedEvent(_))
        ));
        assert!(matches!(
            service.ingest(TOKEN, "not json").await,
            Err(GateError::MalformedEvent(_))
        ));
        assert!(matches!(
            service.ingest("wrong", "{}").await,
            Err(GateError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn recent_events_is_token_guarded_and_limited() {
        let service = make_service();
        for n in 0..3 {
            let body = completed_body(&format!("evt_{n}"), &format!("cs_l{n}"), 1);
            let Ok(_) = service.ingest(TOKEN, &body).await else {
                panic!("ingest failed");
            };
        }

        let rows = service.recent_events(TOKEN, None).await;
        let Ok(rows) = rows else {
            panic!("ledger read failed");
        };
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.event_type == "checkout.completed"));

        let limited = service.recent_events(TOKEN, Some(2)).await;
        assert!(matches!(limited, Ok(rows) if rows.len() == 2));

        assert!(matches!(
            service.recent_events("wrong", None).await,
            Err(GateError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn redeem_consumes_active_ticket_once() {
        let service = make_service();
        let code = issue_one(&service, "cs_5").await;

        let first = service.redeem(&scan(&code, "gate_1")).await;
        let Ok(first) = first else {
            panic!("redeem failed");
        };
        assert_eq!(first.outcome, RedemptionOutcome::Ok);
        let Some(ticket) = first.ticket else {
            panic!("winner must see the updated ticket");
        };
        assert_eq!(ticket.status, TicketStatus::Used);
        assert_eq!(ticket.redeemed_by.as_deref(), Some("gate_1"));
        assert!(ticket.redeemed_at.is_some());

        let replay = service.redeem(&scan(&code, "gate_2")).await;
        let Ok(replay) = replay else {
            panic!("replay failed");
        };
        assert_eq!(replay.outcome, RedemptionOutcome::AlreadyUsed);

        // Two audit rows: ok then already_used, with diagnostics captured.
        let attempts = service.store().attempts_by_code(&code).await;
        let Ok(attempts) = attempts else {
            panic!("audit lookup failed");
        };
        let outcomes: Vec<RedemptionOutcome> = attempts.iter().map(|a| a.outcome).collect();
        assert_eq!(
            outcomes,
            vec![RedemptionOutcome::Ok, RedemptionOutcome::AlreadyUsed]
        );
        assert!(
            attempts
                .iter()
                .all(|a| a.origin.is_some() && a.client.is_some())
        );
    }

    #[tokio::test]
    async fn concurrent_scans_admit_exactly_one() {
        let service = make_service();
        let code = issue_one(&service, "cs_6").await;

        let mut handles = Vec::new();
        for gate in 0..8 {
            let service = service.clone();
            let cmd = scan(&code, &format!("gate_{gate}"));
            handles.push(tokio::spawn(async move { service.redeem(&cmd).await }));
        }

        let mut ok_count = 0;
        let mut rejected = 0;
        for handle in handles {
            let Ok(Ok(receipt)) = handle.await else {
                panic!("redeem task failed");
            };
            if receipt.outcome.is_ok() {
                ok_count += 1;
            } else {
                assert_eq!(receipt.outcome, RedemptionOutcome::AlreadyUsed);
                rejected += 1;
            }
        }
        assert_eq!(ok_count, 1);
        assert_eq!(rejected, 7);

        // Audit completeness: one row per call.
        let attempts = service.store().attempts_by_code(&code).await;
        assert!(matches!(attempts, Ok(rows) if rows.len() == 8));
    }

    #[tokio::test]
    async fn redeem_logs_invalid_codes() {
        let service = make_service();
        let receipt = service.redeem(&scan("does-not-exist", "gate_1")).await;
        let Ok(receipt) = receipt else {
            panic!("redeem failed");
        };
        assert_eq!(receipt.outcome, RedemptionOutcome::Invalid);
        assert!(receipt.ticket.is_none());

        let attempts = service.store().attempts_by_code("does-not-exist").await;
        let Ok(attempts) = attempts else {
            panic!("audit lookup failed");
        };
        assert_eq!(attempts.len(), 1);
        assert_eq!(
            attempts.first().map(|a| a.outcome),
            Some(RedemptionOutcome::Invalid)
        );
    }

    #[tokio::test]
    async fn redeem_surfaces_void_and_refunded_distinctly() {
        let service = make_service();
        let voided = issue_one(&service, "cs_7").await;
        let refunded = issue_one(&service, "cs_8").await;

        let Ok(Some(_)) = service.store().mark_ticket(&voided, TicketStatus::Void).await else {
            panic!("void failed");
        };
        let Ok(Some(_)) = service
            .store()
            .mark_ticket(&refunded, TicketStatus::Refunded)
            .await
        else {
            panic!("refund failed");
        };

        let void_receipt = service.redeem(&scan(&voided, "gate_1")).await;
        assert!(
            matches!(void_receipt, Ok(r) if r.outcome == RedemptionOutcome::Void)
        );
        let refund_receipt = service.redeem(&scan(&refunded, "gate_1")).await;
        assert!(
            matches!(refund_receipt, Ok(r) if r.outcome == RedemptionOutcome::Refunded)
        );

        // The audit trail preserves the specific terminal state.
        let attempts = service.store().attempts_by_code(&voided).await;
        assert!(matches!(
            attempts,
            Ok(rows) if rows.first().map(|a| a.outcome) == Some(RedemptionOutcome::Void)
        ));
    }

    #[tokio::test]
    async fn redeem_rejects_blank_input_without_audit_rows() {
        let service = make_service();
        assert!(matches!(
            service.redeem(&scan("", "gate_1")).await,
            Err(GateError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.redeem(&scan("tkt_x", "  ")).await,
            Err(GateError::InvalidRequest(_))
        ));
        let attempts = service.store().attempts_by_code("tkt_x").await;
        assert!(matches!(attempts, Ok(rows) if rows.is_empty()));
    }

    #[tokio::test]
    async fn validate_exposes_only_public_fields() {
        let service = make_service();
        let code = issue_one(&service, "cs_9").await;

        let summary = service.validate(&code).await;
        let Ok(Some(summary)) = summary else {
            panic!("validate failed");
        };
        assert_eq!(summary.code, code);
        assert_eq!(summary.event_ref, "rodeo-2026");
        assert_eq!(summary.status, TicketStatus::Active);

        let missing = service.validate("tkt_nothing").await;
        assert!(matches!(missing, Ok(None)));
    }

    #[tokio::test]
    async fn buyer_scoped_reads_never_leak_across_identities() {
        let service = make_service();
        let Ok(_) = service.issue(TOKEN, &command("cs_10", 2)).await else {
            panic!("issue failed");
        };

        let own = service.tickets_for_owner("user_1", None).await;
        assert!(matches!(own, Ok(t) if t.len() == 2));

        let foreign = service.tickets_for_owner("user_2", None).await;
        assert!(matches!(foreign, Ok(t) if t.is_empty()));

        let own_purchase = service.purchase_for_owner("user_1", "cs_10").await;
        assert!(own_purchase.is_ok());

        // A foreign purchase is reported absent, not forbidden-with-details.
        let foreign_purchase = service.purchase_for_owner("user_2", "cs_10").await;
        assert!(matches!(
            foreign_purchase,
            Err(GateError::PurchaseNotFound(_))
        ));
    }
}
