//! Service layer: the issuance and redemption engines.

pub mod ticket_service;

pub use ticket_service::{
    IngestReceipt, IssueCommand, IssueReceipt, RedeemCommand, RedemptionReceipt, TicketService,
    TicketSummary,
};
