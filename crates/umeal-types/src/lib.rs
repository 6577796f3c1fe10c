//! Common types module for the uMeal client core.
//!
//! This module defines the data model shared by every crate in the workspace:
//! catalog entities returned by the remote API, cart line items, order
//! projections with their status chain, notification events, and the small
//! configuration-validation framework used by pluggable backends.

/// Request and error body types exchanged with the remote API.
pub mod api;
/// Cart line items and the persisted cart snapshot.
pub mod cart;
/// Restaurants, products, categories, addresses and user profiles.
pub mod catalog;
/// Notification events published by the core components.
pub mod events;
/// Order projections and the order status chain.
pub mod order;
/// Registry trait for self-registering backend implementations.
pub mod registry;
/// Redacting wrapper for credentials.
pub mod secret_string;
/// Storage namespaces for persisted client state.
pub mod storage;
/// Formatting and serde helpers.
pub mod utils;
/// Configuration validation types for backend-specific TOML tables.
pub mod validation;

pub use api::*;
pub use cart::*;
pub use catalog::*;
pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{digits_only, format_order_number, format_price, truncate_id};
pub use validation::*;
