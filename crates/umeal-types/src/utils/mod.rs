//! Utility functions shared across the client crates.

pub mod formatting;
pub mod serde_helpers;

pub use formatting::{digits_only, format_order_number, format_price, truncate_id};
