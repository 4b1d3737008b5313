//! Data Transfer Objects for REST request/response serialization.
//!
//! Monetary amounts are integers in minor currency units throughout; no
//! floating point touches money.

pub mod issue_dto;
pub mod redeem_dto;
pub mod ticket_dto;

pub use issue_dto::*;
pub use redeem_dto::*;
pub use ticket_dto::*;
