//! Domain layer: core ticketing types.
//!
//! This module contains the data model of the service: ticket codes and the
//! ticket status state machine, purchases keyed by checkout session,
//! redemption outcomes with their append-only audit trail, and the strictly
//! parsed inbound checkout event plus its dedup ledger record.

pub mod checkout;
pub mod purchase;
pub mod redemption;
pub mod ticket;
pub mod ticket_code;

pub use checkout::{CheckoutCompleted, CheckoutEvent, EventRecord};
pub use purchase::{PaymentStatus, Purchase};
pub use redemption::{RedemptionAttempt, RedemptionOutcome};
pub use ticket::{Ticket, TicketStatus};
pub use ticket_code::TicketCode;
