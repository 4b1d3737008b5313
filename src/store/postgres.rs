//! PostgreSQL backend using `sqlx::PgPool`.
//!
//! Every primitive is a single statement, so atomicity comes from the
//! database itself: `ON CONFLICT DO NOTHING` on the `(session_id, seq)`
//! unique constraint dedupes concurrent minting, and the redemption update's
//! `WHERE status = 'active'` guard is the compare-and-set that serializes
//! concurrent scans of one code.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::PurchaseUpsert;
use crate::domain::{
    EventRecord, PaymentStatus, Purchase, RedemptionAttempt, RedemptionOutcome, Ticket,
    TicketCode, TicketStatus,
};
use crate::error::GateError;

/// Raw ticket row as selected from the `tickets` table.
type TicketRow = (
    String,
    String,
    String,
    String,
    i32,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<String>,
);

/// Raw purchase row as selected from the `purchases` table.
type PurchaseRow = (
    String,
    String,
    String,
    i64,
    String,
    String,
    Vec<String>,
    DateTime<Utc>,
);

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// See [`super::Store::insert_ticket`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure.
    pub async fn insert_ticket(&self, ticket: &Ticket) -> Result<bool, GateError> {
        let result = sqlx::query(
            "INSERT INTO tickets \
             (code, event_ref, owner_id, session_id, seq, status, issued_at, valid_from, valid_until) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (session_id, seq) DO NOTHING",
        )
        .bind(ticket.code.as_str())
        .bind(&ticket.event_ref)
        .bind(&ticket.owner)
        .bind(&ticket.session_id)
        .bind(ticket.seq)
        .bind(ticket.status.as_str())
        .bind(ticket.issued_at)
        .bind(ticket.valid_from)
        .bind(ticket.valid_until)
        .execute(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    /// See [`super::Store::ticket_by_code`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure or a corrupt row.
    pub async fn ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, GateError> {
        let row = sqlx::query_as::<_, TicketRow>(
            "SELECT code, event_ref, owner_id, session_id, seq, status, issued_at, \
             valid_from, valid_until, redeemed_at, redeemed_by \
             FROM tickets WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        row.map(ticket_from_row).transpose()
    }

    /// See [`super::Store::tickets_by_session`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure or a corrupt row.
    pub async fn tickets_by_session(&self, session_id: &str) -> Result<Vec<Ticket>, GateError> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT code, event_ref, owner_id, session_id, seq, status, issued_at, \
             valid_from, valid_until, redeemed_at, redeemed_by \
             FROM tickets WHERE session_id = $1 ORDER BY seq ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        rows.into_iter().map(ticket_from_row).collect()
    }

    /// See [`super::Store::tickets_by_owner`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure or a corrupt row.
    pub async fn tickets_by_owner(
        &self,
        owner: &str,
        limit: i64,
    ) -> Result<Vec<Ticket>, GateError> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT code, event_ref, owner_id, session_id, seq, status, issued_at, \
             valid_from, valid_until, redeemed_at, redeemed_by \
             FROM tickets WHERE owner_id = $1 ORDER BY issued_at DESC LIMIT $2",
        )
        .bind(owner)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        rows.into_iter().map(ticket_from_row).collect()
    }

    /// See [`super::Store::redeem_and_log`].
    ///
    /// The compare-and-set and the audit insert run in one transaction: a
    /// consumed ticket always has its winning scan on record, even if the
    /// pool fails between the two statements.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure or a corrupt row.
    pub async fn redeem_and_log(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<Option<Ticket>, GateError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GateError::Store(e.to_string()))?;

        let row = sqlx::query_as::<_, TicketRow>(
            "UPDATE tickets SET status = 'used', redeemed_at = $2, redeemed_by = $3 \
             WHERE code = $1 AND status = 'active' \
             RETURNING code, event_ref, owner_id, session_id, seq, status, issued_at, \
             valid_from, valid_until, redeemed_at, redeemed_by",
        )
        .bind(&attempt.ticket_code)
        .bind(attempt.attempted_at)
        .bind(&attempt.gate_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| GateError::Store(e.to_string()))?;
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO redemption_attempts \
             (id, ticket_code, gate_id, attempted_at, origin, client, outcome) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(attempt.id)
        .bind(&attempt.ticket_code)
        .bind(&attempt.gate_id)
        .bind(attempt.attempted_at)
        .bind(&attempt.origin)
        .bind(&attempt.client)
        .bind(attempt.outcome.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| GateError::Store(e.to_string()))?;

        ticket_from_row(row).map(Some)
    }

    /// See [`super::Store::mark_ticket`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure or a corrupt row.
    pub async fn mark_ticket(
        &self,
        code: &str,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, GateError> {
        let row = sqlx::query_as::<_, TicketRow>(
            "UPDATE tickets SET status = $2 \
             WHERE code = $1 AND status = 'active' \
             RETURNING code, event_ref, owner_id, session_id, seq, status, issued_at, \
             valid_from, valid_until, redeemed_at, redeemed_by",
        )
        .bind(code)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        row.map(ticket_from_row).transpose()
    }

    /// See [`super::Store::upsert_purchase`].
    ///
    /// The conflict arm merges the incoming codes into the stored list as an
    /// order-preserving set union, so replayed issuance never replaces or
    /// shrinks the list. `created_at` is kept from the original insert.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure or a corrupt row.
    pub async fn upsert_purchase(&self, up: &PurchaseUpsert) -> Result<Purchase, GateError> {
        // The conflict arm deliberately omits created_at: the original
        // insert's timestamp survives every merge, same as the memory
        // backend.
        let row = sqlx::query_as::<_, PurchaseRow>(
            "INSERT INTO purchases \
             (session_id, event_ref, owner_id, amount_total, currency, payment_status, ticket_codes, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (session_id) DO UPDATE SET \
                 event_ref = EXCLUDED.event_ref, \
                 owner_id = EXCLUDED.owner_id, \
                 amount_total = EXCLUDED.amount_total, \
                 currency = EXCLUDED.currency, \
                 payment_status = EXCLUDED.payment_status, \
                 ticket_codes = ( \
                     SELECT COALESCE(array_agg(code ORDER BY first_pos), '{}') \
                     FROM ( \
                         SELECT code, min(pos) AS first_pos \
                         FROM unnest(purchases.ticket_codes || EXCLUDED.ticket_codes) \
                              WITH ORDINALITY AS u(code, pos) \
                         GROUP BY code \
                     ) dedup \
                 ) \
             RETURNING session_id, event_ref, owner_id, amount_total, currency, payment_status, \
             ticket_codes, created_at",
        )
        .bind(&up.session_id)
        .bind(&up.event_ref)
        .bind(&up.owner)
        .bind(up.amount_total)
        .bind(&up.currency)
        .bind(up.payment_status.as_str())
        .bind(&up.ticket_codes)
        .bind(up.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        purchase_from_row(row)
    }

    /// See [`super::Store::purchase_by_session`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure or a corrupt row.
    pub async fn purchase_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Purchase>, GateError> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            "SELECT session_id, event_ref, owner_id, amount_total, currency, payment_status, \
             ticket_codes, created_at \
             FROM purchases WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        row.map(purchase_from_row).transpose()
    }

    /// See [`super::Store::append_attempt`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure.
    pub async fn append_attempt(&self, attempt: &RedemptionAttempt) -> Result<(), GateError> {
        sqlx::query(
            "INSERT INTO redemption_attempts \
             (id, ticket_code, gate_id, attempted_at, origin, client, outcome) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(attempt.id)
        .bind(&attempt.ticket_code)
        .bind(&attempt.gate_id)
        .bind(attempt.attempted_at)
        .bind(&attempt.origin)
        .bind(&attempt.client)
        .bind(attempt.outcome.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        Ok(())
    }

    /// See [`super::Store::attempts_by_code`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure or a corrupt row.
    pub async fn attempts_by_code(
        &self,
        code: &str,
    ) -> Result<Vec<RedemptionAttempt>, GateError> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                String,
                String,
                DateTime<Utc>,
                Option<String>,
                Option<String>,
                String,
            ),
        >(
            "SELECT id, ticket_code, gate_id, attempted_at, origin, client, outcome \
             FROM redemption_attempts WHERE ticket_code = $1 ORDER BY attempted_at ASC",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        rows.into_iter()
            .map(
                |(id, ticket_code, gate_id, attempted_at, origin, client, outcome)| {
                    Ok(RedemptionAttempt {
                        id,
                        ticket_code,
                        gate_id,
                        attempted_at,
                        origin,
                        client,
                        outcome: RedemptionOutcome::from_str(&outcome)
                            .map_err(GateError::Store)?,
                    })
                },
            )
            .collect()
    }

    /// See [`super::Store::record_event`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure.
    pub async fn record_event(&self, record: &EventRecord) -> Result<bool, GateError> {
        let result = sqlx::query(
            "INSERT INTO checkout_events (event_id, event_type, received_at, payload_digest) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.received_at)
        .bind(&record.payload_digest)
        .execute(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    /// See [`super::Store::recent_events`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] on database failure.
    pub async fn recent_events(&self, limit: i64) -> Result<Vec<EventRecord>, GateError> {
        let rows = sqlx::query_as::<_, (String, String, DateTime<Utc>, String)>(
            "SELECT event_id, event_type, received_at, payload_digest \
             FROM checkout_events ORDER BY received_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GateError::Store(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(event_id, event_type, received_at, payload_digest)| EventRecord {
                    event_id,
                    event_type,
                    received_at,
                    payload_digest,
                },
            )
            .collect())
    }
}

fn ticket_from_row(row: TicketRow) -> Result<Ticket, GateError> {
    let (
        code,
        event_ref,
        owner,
        session_id,
        seq,
        status,
        issued_at,
        valid_from,
        valid_until,
        redeemed_at,
        redeemed_by,
    ) = row;
    Ok(Ticket {
        code: TicketCode::from_string(code),
        event_ref,
        owner,
        session_id,
        seq,
        status: TicketStatus::from_str(&status).map_err(GateError::Store)?,
        issued_at,
        valid_from,
        valid_until,
        redeemed_at,
        redeemed_by,
    })
}

fn purchase_from_row(row: PurchaseRow) -> Result<Purchase, GateError> {
    let (session_id, event_ref, owner, amount_total, currency, payment_status, ticket_codes, created_at) =
        row;
    Ok(Purchase {
        session_id,
        event_ref,
        owner,
        amount_total,
        currency,
        payment_status: PaymentStatus::from_str(&payment_status).map_err(GateError::Store)?,
        ticket_codes,
        created_at,
    })
}
