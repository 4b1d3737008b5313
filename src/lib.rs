//! # rodeo-gate
//!
//! Ticket issuance and redemption service for rodeo event admissions.
//!
//! Payment checkout events arrive over an at-least-once webhook; this crate
//! turns each completed checkout into exactly one set of admission tickets,
//! no matter how many times the event is delivered, and lets gate staff
//! consume each ticket exactly once with a full audit trail of every scan.
//!
//! ## Architecture
//!
//! ```text
//! Payment provider (webhook)      Gate scanners, buyers (HTTP)
//!     │                               │
//!     └── Webhook Handler             ├── REST Handlers (api/)
//!             │                       │
//!             └──────► TicketService (service/)
//!                          │
//!                          ├── Domain model (domain/)
//!                          │
//!                          └── Store (store/)
//!                                 ├── PostgreSQL
//!                                 └── In-memory (tests, dev)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
