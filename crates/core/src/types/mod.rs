//! Shared type definitions.
//!
//! - [`id`] - Newtype ID wrappers (`define_id!` / `define_uuid_id!`)
//! - [`currency`] - Currency codes and per-currency rounding
//! - [`status`] - Order, payment, and transaction status enums

pub mod currency;
pub mod id;
pub mod status;

pub use currency::*;
pub use id::*;
pub use status::*;
