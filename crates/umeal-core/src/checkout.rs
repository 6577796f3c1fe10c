//! Checkout: delivery address selection and order submission.

use crate::cart::{CartError, CartStore};
use crate::event_bus::EventBus;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use umeal_api::{ApiError, BackendService};
use umeal_types::{truncate_id, CheckoutEvent, ClientEvent, DeliveryAddress, NewOrderRequest};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
	#[error("Cart is empty")]
	EmptyCart,
	#[error("No delivery address selected")]
	MissingAddress,
	#[error("Backend error: {0}")]
	Backend(#[from] ApiError),
	/// The API accepted the order but the cart could not be emptied. The order
	/// exists and must not be submitted again.
	#[error("Order placed, but the cart could not be cleared: {0}")]
	PlacedCartKept(CartError),
}

/// The user's saved addresses and the one preselected for delivery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressBook {
	pub addresses: Vec<DeliveryAddress>,
	/// The first address, when there is one.
	pub selected: Option<i64>,
}

pub struct Checkout {
	backend: Arc<BackendService>,
	events: EventBus,
}

impl Checkout {
	pub fn new(backend: Arc<BackendService>, events: EventBus) -> Self {
		Self { backend, events }
	}

	pub async fn load_addresses(&self) -> Result<AddressBook, CheckoutError> {
		let addresses = self.backend.my_addresses().await?;
		let selected = addresses.first().map(|a| a.id);
		Ok(AddressBook {
			addresses,
			selected,
		})
	}

	/// Places an order for the cart's contents.
	///
	/// On success the cart is cleared. If the API rejects the order the cart is
	/// kept as it was. Once the API has accepted it the order counts as placed,
	/// even when clearing the cart fails afterwards.
	#[instrument(skip_all, fields(restaurant_id = ?cart.restaurant_id().map(truncate_id)))]
	pub async fn submit(
		&self,
		cart: &mut CartStore,
		address_id: Option<i64>,
	) -> Result<(), CheckoutError> {
		let restaurant_id = match cart.restaurant_id() {
			Some(id) if !cart.is_empty() => id.to_string(),
			_ => return Err(CheckoutError::EmptyCart),
		};
		let address_id = address_id.ok_or(CheckoutError::MissingAddress)?;

		let request = NewOrderRequest::from_cart(&restaurant_id, address_id, cart.items());
		if let Err(e) = self.backend.create_order(&request).await {
			tracing::warn!(error = %e, "Order submission failed");
			self.events
				.publish(ClientEvent::Checkout(CheckoutEvent::Failed {
					message: e.user_message(),
				}))
				.ok();
			return Err(e.into());
		}

		tracing::info!(
			items = request.items.len(),
			total = %cart.cart_total(),
			"Order placed"
		);
		self.events
			.publish(ClientEvent::Checkout(CheckoutEvent::OrderPlaced { restaurant_id }))
			.ok();
		if let Err(e) = cart.clear_cart().await {
			tracing::warn!(error = %e, "Order placed but the cart could not be cleared");
			return Err(CheckoutError::PlacedCartKept(e));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mocks::storage_failing_deletes;
	use rust_decimal::Decimal;
	use umeal_api::implementations::memory::{Fixture, MemoryBackend};
	use umeal_storage::implementations::memory::MemoryStorage;
	use umeal_storage::StorageService;
	use umeal_types::{Product, Restaurant};

	fn lasanha() -> Product {
		Product {
			id: 10,
			name: "Lasanha".into(),
			price: Decimal::new(3500, 2),
			description: String::new(),
			category_id: None,
			image_url: None,
		}
	}

	fn fixture() -> Fixture {
		let restaurant: Restaurant =
			serde_json::from_value(serde_json::json!({"id": "r1", "restaurantName": "Cantina"}))
				.unwrap();
		let mut fixture = Fixture {
			restaurants: vec![restaurant],
			addresses: vec![
				DeliveryAddress {
					id: 3,
					..Default::default()
				},
				DeliveryAddress {
					id: 4,
					..Default::default()
				},
			],
			..Default::default()
		};
		fixture.products.insert("r1".into(), vec![lasanha()]);
		fixture
	}

	async fn setup() -> (Checkout, CartStore, MemoryBackend, EventBus) {
		let backend = MemoryBackend::with_fixture(fixture());
		let events = EventBus::default();
		let checkout = Checkout::new(
			Arc::new(BackendService::new(Box::new(backend.clone()))),
			events.clone(),
		);
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let cart = CartStore::load(storage, events.clone()).await.unwrap();
		(checkout, cart, backend, events)
	}

	#[tokio::test]
	async fn test_first_address_is_preselected() {
		let (checkout, _, _, _) = setup().await;
		let book = checkout.load_addresses().await.unwrap();
		assert_eq!(book.addresses.len(), 2);
		assert_eq!(book.selected, Some(3));
	}

	#[tokio::test]
	async fn test_submit_clears_cart() {
		let (checkout, mut cart, backend, events) = setup().await;
		cart.add_to_cart(lasanha(), "r1").await.unwrap();
		cart.add_to_cart(lasanha(), "r1").await.unwrap();
		let mut rx = events.subscribe();

		checkout.submit(&mut cart, Some(3)).await.unwrap();

		assert!(cart.is_empty());
		let placed = backend.fixture().await.orders["r1"].clone();
		assert_eq!(placed.len(), 1);
		assert_eq!(placed[0].items[0].quantity, 2);

		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Checkout(CheckoutEvent::OrderPlaced {
				restaurant_id: "r1".into()
			})
		);
		assert_eq!(rx.try_recv().unwrap(), ClientEvent::Cart(umeal_types::CartEvent::Cleared));
	}

	#[tokio::test]
	async fn test_clear_failure_after_placing_is_not_a_submission_failure() {
		let backend = MemoryBackend::with_fixture(fixture());
		let events = EventBus::default();
		let checkout = Checkout::new(
			Arc::new(BackendService::new(Box::new(backend.clone()))),
			events.clone(),
		);
		let storage = Arc::new(StorageService::new(Box::new(storage_failing_deletes())));
		let mut cart = CartStore::load(storage, events.clone()).await.unwrap();
		cart.add_to_cart(lasanha(), "r1").await.unwrap();
		let mut rx = events.subscribe();

		let result = checkout.submit(&mut cart, Some(3)).await;

		assert!(matches!(
			result,
			Err(CheckoutError::PlacedCartKept(CartError::Storage(_)))
		));
		assert_eq!(backend.fixture().await.orders["r1"].len(), 1);
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Checkout(CheckoutEvent::OrderPlaced {
				restaurant_id: "r1".into()
			})
		);
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_validation_rejects_without_calling_api() {
		let (checkout, mut cart, backend, _) = setup().await;
		assert!(matches!(
			checkout.submit(&mut cart, Some(3)).await,
			Err(CheckoutError::EmptyCart)
		));

		cart.add_to_cart(lasanha(), "r1").await.unwrap();
		assert!(matches!(
			checkout.submit(&mut cart, None).await,
			Err(CheckoutError::MissingAddress)
		));
		assert_eq!(cart.cart_count(), 1);
		assert!(backend.fixture().await.orders.is_empty());
	}

	#[tokio::test]
	async fn test_failure_keeps_cart() {
		let (checkout, mut cart, backend, events) = setup().await;
		cart.add_to_cart(lasanha(), "r1").await.unwrap();
		let before = cart.state().clone();
		let mut rx = events.subscribe();

		backend
			.fail_next(ApiError::Http {
				status: 422,
				message: "Restaurante fechado".into(),
			})
			.await;
		let result = checkout.submit(&mut cart, Some(3)).await;

		assert!(matches!(result, Err(CheckoutError::Backend(_))));
		assert_eq!(cart.state(), &before);
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Checkout(CheckoutEvent::Failed {
				message: "Restaurante fechado".into()
			})
		);
	}
}
