//! Core components of the uMeal client.
//!
//! A [`Client`] ties together the persisted cart, the restaurant order board,
//! checkout, the catalog and account management. Components report outcomes through the shared
//! [`EventBus`]; presenting them is left to whoever drives the client.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use umeal_api::BackendService;
use umeal_config::Config;

pub mod account;
pub mod board;
pub mod builder;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod event_bus;

#[cfg(test)]
mod mocks;

pub use account::{Account, AccountError, RestaurantForm};
pub use board::{AdvanceOutcome, BoardError, Lane, OrderBoard, PollerHandle};
pub use builder::{ClientBuilder, ClientError, ClientFactories};
pub use cart::{AddOutcome, CartConflict, CartError, CartState, CartStore};
pub use catalog::{filter_restaurants, Catalog, CatalogError};
pub use checkout::{AddressBook, Checkout, CheckoutError};
pub use event_bus::EventBus;

/// A fully wired client.
///
/// The cart is loaded once when the client is built. Every caller shares that
/// one store, so there is never a second copy that could drift from it.
pub struct Client {
	config: Config,
	cart: Arc<Mutex<CartStore>>,
	backend: Arc<BackendService>,
	events: EventBus,
}

impl Client {
	pub fn new(
		config: Config,
		cart: CartStore,
		backend: Arc<BackendService>,
		events: EventBus,
	) -> Self {
		Self {
			config,
			cart: Arc::new(Mutex::new(cart)),
			backend,
			events,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn events(&self) -> &EventBus {
		&self.events
	}

	/// Locks the cart for reading or changing it.
	pub async fn cart(&self) -> MutexGuard<'_, CartStore> {
		self.cart.lock().await
	}

	/// Shared handle to the cart, for tasks that outlive a borrow of the client.
	pub fn cart_handle(&self) -> Arc<Mutex<CartStore>> {
		Arc::clone(&self.cart)
	}

	/// Creates a board for one restaurant's orders. The board starts empty
	/// until refreshed.
	pub fn board(&self, restaurant_id: &str) -> Arc<OrderBoard> {
		Arc::new(OrderBoard::new(
			restaurant_id,
			self.backend.clone(),
			self.events.clone(),
		))
	}

	pub fn checkout(&self) -> Checkout {
		Checkout::new(self.backend.clone(), self.events.clone())
	}

	pub fn catalog(&self) -> Catalog {
		Catalog::new(self.backend.clone())
	}

	pub fn account(&self) -> Account {
		Account::new(self.backend.clone(), self.events.clone())
	}
}
