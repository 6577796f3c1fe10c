//! Event types for notifying the presentation layer.
//!
//! Components never render notifications themselves. They publish these events
//! on the event bus and whoever drives the UI decides how to surface them.

use crate::OrderStatus;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientEvent {
	/// Events from the cart store.
	Cart(CartEvent),
	/// Events from the order board.
	Board(BoardEvent),
	/// Events from the checkout flow.
	Checkout(CheckoutEvent),
	/// Events from profile, address and restaurant management.
	Account(AccountEvent),
}

/// Events related to the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CartEvent {
	/// A unit of a product was added; `cart_count` is the resulting total.
	ItemAdded {
		product_name: String,
		cart_count: u32,
	},
	/// An add was rejected because the cart belongs to another restaurant.
	Conflict {
		current_restaurant_id: String,
		requested_restaurant_id: String,
	},
	/// The cart was emptied.
	Cleared,
}

/// Events related to the order board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoardEvent {
	/// The order list was replaced by a fresh fetch.
	Refreshed { restaurant_id: String, count: usize },
	/// A refresh failed and the previous orders were kept.
	RefreshFailed {
		restaurant_id: String,
		message: String,
	},
	/// The server confirmed a status change.
	StatusAdvanced {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// A status change was rejected and the board was rolled back.
	AdvanceFailed { order_id: String, message: String },
}

/// Events related to checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckoutEvent {
	/// The order was accepted by the API and the cart was cleared.
	OrderPlaced { restaurant_id: String },
	/// Submission failed; the cart was kept.
	Failed { message: String },
}

/// Events related to the signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountEvent {
	/// An address was created or updated.
	AddressSaved { address_id: i64 },
	AddressRemoved { address_id: i64 },
	ProfileUpdated,
	/// Onboarding finished; the owner can now manage a menu and receive orders.
	RestaurantOpened { restaurant_name: String },
}
