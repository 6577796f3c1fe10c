//! Cart store.
//!
//! Holds the draft of the single order the user is building. A cart belongs to
//! at most one restaurant: adding a product from another restaurant is
//! rejected with a [`CartConflict`] instead of silently mixing carts.
//!
//! Every mutation is computed on a copy of the state, persisted, and only then
//! committed in memory, so a storage failure leaves the cart exactly as it was.

use crate::event_bus::EventBus;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use umeal_storage::{StorageError, StorageService};
use umeal_types::{
	truncate_id, CartEvent, CartItem, ClientEvent, Product, StorageKey, CART_ITEMS_ID,
	CART_RESTAURANT_ID,
};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StorageError> for CartError {
	fn from(err: StorageError) -> Self {
		CartError::Storage(err.to_string())
	}
}

/// Items plus the restaurant they belong to.
///
/// `restaurant_id` is set exactly when `items` is non-empty, product ids are
/// unique and every quantity is at least 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
	items: Vec<CartItem>,
	restaurant_id: Option<String>,
}

impl CartState {
	pub fn items(&self) -> &[CartItem] {
		&self.items
	}

	pub fn restaurant_id(&self) -> Option<&str> {
		self.restaurant_id.as_deref()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Sum of unit price times quantity.
	pub fn total(&self) -> Decimal {
		self.items.iter().map(CartItem::subtotal).sum()
	}

	/// Sum of quantities.
	pub fn count(&self) -> u32 {
		self.items
			.iter()
			.fold(0u32, |acc, item| acc.saturating_add(item.quantity))
	}

	/// Repairs a persisted snapshot. Returns the repaired state and whether
	/// anything had to change.
	fn normalised(items: Vec<CartItem>, restaurant_id: Option<String>) -> (Self, bool) {
		let mut repaired = false;
		let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
		for item in items {
			if item.quantity == 0 {
				repaired = true;
				continue;
			}
			match merged.iter_mut().find(|m| m.product.id == item.product.id) {
				Some(existing) => {
					existing.quantity = existing.quantity.saturating_add(item.quantity);
					repaired = true;
				},
				None => merged.push(item),
			}
		}

		match (restaurant_id.filter(|id| !id.is_empty()), merged.is_empty()) {
			(Some(restaurant_id), false) => (
				Self {
					items: merged,
					restaurant_id: Some(restaurant_id),
				},
				repaired,
			),
			(None, true) => (Self::default(), repaired),
			// Items without a restaurant, or a restaurant without items.
			_ => (Self::default(), true),
		}
	}
}

/// Result of [`CartStore::add_to_cart`].
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
	/// The product was added; `cart_count` is the new total quantity.
	Added { cart_count: u32 },
	/// The cart belongs to another restaurant and was left untouched.
	Conflict(CartConflict),
}

/// A rejected add. Carries what is needed to resolve it.
#[derive(Debug, Clone, PartialEq)]
pub struct CartConflict {
	pub current_restaurant_id: String,
	pub requested_restaurant_id: String,
	pub product: Product,
}

impl CartConflict {
	/// Discards the current cart and adds the rejected product to a fresh one.
	pub async fn clear_and_retry(self, store: &mut CartStore) -> Result<AddOutcome, CartError> {
		store.clear_cart().await?;
		store
			.add_to_cart(self.product, &self.requested_restaurant_id)
			.await
	}
}

/// The authoritative cart, persisted after every mutation.
pub struct CartStore {
	storage: Arc<StorageService>,
	events: EventBus,
	state: CartState,
}

impl CartStore {
	/// Rehydrates the cart from storage.
	///
	/// Missing keys yield an empty cart. Unreadable or inconsistent snapshots
	/// are repaired, logged, and written back.
	pub async fn load(storage: Arc<StorageService>, events: EventBus) -> Result<Self, CartError> {
		let namespace = StorageKey::Cart.as_str();
		let mut unreadable = false;

		let items = match storage
			.retrieve_optional::<Vec<CartItem>>(namespace, CART_ITEMS_ID)
			.await
		{
			Ok(items) => items.unwrap_or_default(),
			Err(StorageError::Serialization(e)) => {
				tracing::warn!("Discarding unreadable cart items: {}", e);
				unreadable = true;
				Vec::new()
			},
			Err(e) => return Err(e.into()),
		};
		let restaurant_id = match storage
			.retrieve_optional::<String>(namespace, CART_RESTAURANT_ID)
			.await
		{
			Ok(id) => id,
			Err(StorageError::Serialization(e)) => {
				tracing::warn!("Discarding unreadable cart restaurant: {}", e);
				unreadable = true;
				None
			},
			Err(e) => return Err(e.into()),
		};

		let (state, repaired) = CartState::normalised(items, restaurant_id);
		let mut store = Self {
			storage,
			events,
			state: CartState::default(),
		};

		if repaired || unreadable {
			tracing::warn!(
				items = state.items.len(),
				"Persisted cart was inconsistent, saving repaired copy"
			);
			store.commit(state).await?;
		} else {
			store.state = state;
		}

		tracing::debug!(
			items = store.state.items.len(),
			restaurant_id = ?store.state.restaurant_id,
			"Loaded cart"
		);
		Ok(store)
	}

	pub fn state(&self) -> &CartState {
		&self.state
	}

	pub fn items(&self) -> &[CartItem] {
		self.state.items()
	}

	pub fn restaurant_id(&self) -> Option<&str> {
		self.state.restaurant_id()
	}

	pub fn is_empty(&self) -> bool {
		self.state.is_empty()
	}

	pub fn cart_total(&self) -> Decimal {
		self.state.total()
	}

	pub fn cart_count(&self) -> u32 {
		self.state.count()
	}

	/// Adds one unit of `product` from `restaurant_id`.
	///
	/// A cart bound to another restaurant is not modified; the conflict is
	/// returned for the caller to resolve.
	pub async fn add_to_cart(
		&mut self,
		product: Product,
		restaurant_id: &str,
	) -> Result<AddOutcome, CartError> {
		if let Some(current) = self.state.restaurant_id.as_deref() {
			if current != restaurant_id {
				tracing::info!(
					current = %truncate_id(current),
					requested = %truncate_id(restaurant_id),
					"Rejected item from another restaurant"
				);
				self.events
					.publish(ClientEvent::Cart(CartEvent::Conflict {
						current_restaurant_id: current.to_string(),
						requested_restaurant_id: restaurant_id.to_string(),
					}))
					.ok();
				return Ok(AddOutcome::Conflict(CartConflict {
					current_restaurant_id: current.to_string(),
					requested_restaurant_id: restaurant_id.to_string(),
					product,
				}));
			}
		}

		let product_name = product.name.clone();
		let mut draft = self.state.clone();
		draft.restaurant_id = Some(restaurant_id.to_string());
		match draft.items.iter_mut().find(|i| i.product.id == product.id) {
			Some(item) => item.quantity = item.quantity.saturating_add(1),
			None => draft.items.push(CartItem::new(product)),
		}
		self.commit(draft).await?;

		let cart_count = self.cart_count();
		self.events
			.publish(ClientEvent::Cart(CartEvent::ItemAdded {
				product_name,
				cart_count,
			}))
			.ok();
		Ok(AddOutcome::Added { cart_count })
	}

	/// Removes a product regardless of its quantity.
	pub async fn remove_from_cart(&mut self, product_id: i64) -> Result<(), CartError> {
		let mut draft = self.state.clone();
		draft.items.retain(|i| i.product.id != product_id);
		if draft.items.len() == self.state.items.len() {
			return Ok(());
		}
		if draft.items.is_empty() {
			draft.restaurant_id = None;
		}
		self.commit(draft).await
	}

	/// Changes a quantity by `delta`, removing the item when it reaches zero.
	///
	/// Unknown product ids are ignored.
	pub async fn update_quantity(&mut self, product_id: i64, delta: i64) -> Result<(), CartError> {
		let mut draft = self.state.clone();
		let Some(pos) = draft.items.iter().position(|i| i.product.id == product_id) else {
			return Ok(());
		};

		let quantity = (i64::from(draft.items[pos].quantity) + delta).clamp(0, i64::from(u32::MAX));
		if quantity == 0 {
			draft.items.remove(pos);
			if draft.items.is_empty() {
				draft.restaurant_id = None;
			}
		} else {
			draft.items[pos].quantity = quantity as u32;
		}

		if draft == self.state {
			return Ok(());
		}
		self.commit(draft).await
	}

	/// Empties the cart and removes the persisted snapshot.
	pub async fn clear_cart(&mut self) -> Result<(), CartError> {
		self.commit(CartState::default()).await?;
		self.events
			.publish(ClientEvent::Cart(CartEvent::Cleared))
			.ok();
		Ok(())
	}

	async fn commit(&mut self, draft: CartState) -> Result<(), CartError> {
		self.persist(&draft).await?;
		self.state = draft;
		Ok(())
	}

	async fn persist(&self, state: &CartState) -> Result<(), StorageError> {
		let namespace = StorageKey::Cart.as_str();
		match &state.restaurant_id {
			Some(restaurant_id) if !state.items.is_empty() => {
				self.storage
					.store(namespace, CART_ITEMS_ID, &state.items)
					.await?;
				self.storage
					.store(namespace, CART_RESTAURANT_ID, restaurant_id)
					.await
			},
			_ => {
				self.storage.remove(namespace, CART_ITEMS_ID).await?;
				self.storage.remove(namespace, CART_RESTAURANT_ID).await
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mocks::MockStorage;
	use tokio::sync::broadcast::error::TryRecvError;
	use umeal_storage::implementations::memory::MemoryStorage;
	use umeal_storage::StorageInterface;

	fn product(id: i64, cents: i64) -> Product {
		Product {
			id,
			name: format!("Produto {}", id),
			price: Decimal::new(cents, 2),
			description: String::new(),
			category_id: None,
			image_url: None,
		}
	}

	fn memory_storage() -> Arc<StorageService> {
		Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
	}

	async fn empty_store(storage: Arc<StorageService>) -> CartStore {
		CartStore::load(storage, EventBus::default()).await.unwrap()
	}

	#[tokio::test]
	async fn test_repeated_adds_increment_single_entry() {
		let mut store = empty_store(memory_storage()).await;

		for _ in 0..3 {
			store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		}
		store.add_to_cart(product(2, 500), "r1").await.unwrap();

		assert_eq!(store.cart_count(), 4);
		assert_eq!(store.items().len(), 2);
		assert_eq!(store.items()[0].quantity, 3);
		assert_eq!(store.restaurant_id(), Some("r1"));
	}

	#[tokio::test]
	async fn test_cross_restaurant_add_is_rejected() {
		let events = EventBus::default();
		let mut rx = events.subscribe();
		let mut store = CartStore::load(memory_storage(), events).await.unwrap();
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		let before = store.state().clone();

		let outcome = store.add_to_cart(product(7, 300), "r2").await.unwrap();

		let AddOutcome::Conflict(conflict) = outcome else {
			panic!("expected a conflict, got {:?}", outcome);
		};
		assert_eq!(conflict.current_restaurant_id, "r1");
		assert_eq!(conflict.requested_restaurant_id, "r2");
		assert_eq!(store.state(), &before);

		assert!(matches!(
			rx.try_recv().unwrap(),
			ClientEvent::Cart(CartEvent::ItemAdded { .. })
		));
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Cart(CartEvent::Conflict {
				current_restaurant_id: "r1".into(),
				requested_restaurant_id: "r2".into(),
			})
		);

		let outcome = conflict.clear_and_retry(&mut store).await.unwrap();
		assert_eq!(outcome, AddOutcome::Added { cart_count: 1 });
		assert_eq!(store.restaurant_id(), Some("r2"));
		assert_eq!(store.items().len(), 1);
		assert_eq!(store.items()[0].product.id, 7);
	}

	#[tokio::test]
	async fn test_item_added_event_carries_count() {
		let events = EventBus::default();
		let mut rx = events.subscribe();
		let mut store = CartStore::load(memory_storage(), events).await.unwrap();

		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();

		rx.try_recv().unwrap();
		assert_eq!(
			rx.try_recv().unwrap(),
			ClientEvent::Cart(CartEvent::ItemAdded {
				product_name: "Produto 1".into(),
				cart_count: 2,
			})
		);
		assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
	}

	#[tokio::test]
	async fn test_decrement_to_zero_unbinds_restaurant() {
		let storage = memory_storage();
		let mut store = empty_store(storage.clone()).await;
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();

		store.update_quantity(1, -2).await.unwrap();

		assert!(store.is_empty());
		assert_eq!(store.restaurant_id(), None);
		assert!(!storage.exists("cart", CART_ITEMS_ID).await.unwrap());
		assert!(!storage.exists("cart", CART_RESTAURANT_ID).await.unwrap());
	}

	#[tokio::test]
	async fn test_large_negative_delta_removes_only_that_item() {
		let mut store = empty_store(memory_storage()).await;
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(2, 1000), "r1").await.unwrap();

		store.update_quantity(1, -10).await.unwrap();
		store.update_quantity(99, 5).await.unwrap();

		assert_eq!(store.items().len(), 1);
		assert_eq!(store.items()[0].product.id, 2);
		assert_eq!(store.restaurant_id(), Some("r1"));
	}

	#[tokio::test]
	async fn test_remove_from_cart() {
		let mut store = empty_store(memory_storage()).await;
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(2, 1000), "r1").await.unwrap();

		store.remove_from_cart(1).await.unwrap();
		assert_eq!(store.cart_count(), 1);
		store.remove_from_cart(2).await.unwrap();
		assert!(store.is_empty());
		assert_eq!(store.restaurant_id(), None);
	}

	#[tokio::test]
	async fn test_clear_then_add_starts_fresh() {
		let mut store = empty_store(memory_storage()).await;
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(2, 1000), "r1").await.unwrap();

		store.clear_cart().await.unwrap();
		store.add_to_cart(product(3, 1000), "r9").await.unwrap();

		assert_eq!(store.items().len(), 1);
		assert_eq!(store.items()[0].quantity, 1);
		assert_eq!(store.restaurant_id(), Some("r9"));
	}

	#[tokio::test]
	async fn test_total_and_count() {
		let mut store = empty_store(memory_storage()).await;
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();

		assert_eq!(store.cart_total(), Decimal::new(2000, 2));
		assert_eq!(store.cart_count(), 2);

		store.update_quantity(1, 1).await.unwrap();
		assert_eq!(store.items()[0].quantity, 3);
		assert_eq!(store.cart_total(), Decimal::new(3000, 2));
	}

	/// Replays pseudo-random add/update/remove sequences against a plain
	/// quantity map and checks the cart agrees after every step.
	#[tokio::test]
	async fn test_generated_sequences_match_quantity_model() {
		use std::collections::BTreeMap;

		for seed in [1u64, 7, 42, 1234, 99_999] {
			let storage = memory_storage();
			let mut store = empty_store(storage.clone()).await;
			let mut model: BTreeMap<i64, u32> = BTreeMap::new();
			let mut state = seed;
			let mut next = |bound: u64| {
				state = state
					.wrapping_mul(6_364_136_223_846_793_005)
					.wrapping_add(1_442_695_040_888_963_407);
				(state >> 33) % bound
			};

			for _ in 0..60 {
				let id = next(5) as i64 + 1;
				match next(4) {
					0 | 1 => {
						store.add_to_cart(product(id, 500), "r1").await.unwrap();
						*model.entry(id).or_default() += 1;
					},
					2 => {
						let delta = next(7) as i64 - 3;
						store.update_quantity(id, delta).await.unwrap();
						if let Some(quantity) = model.get(&id).copied() {
							let updated = (i64::from(quantity) + delta).max(0) as u32;
							if updated == 0 {
								model.remove(&id);
							} else {
								model.insert(id, updated);
							}
						}
					},
					_ => {
						store.remove_from_cart(id).await.unwrap();
						model.remove(&id);
					},
				}

				let actual: BTreeMap<i64, u32> = store
					.items()
					.iter()
					.map(|i| (i.product.id, i.quantity))
					.collect();
				assert_eq!(actual.len(), store.items().len(), "duplicate entry (seed {})", seed);
				assert_eq!(actual, model, "seed {}", seed);
				assert_eq!(store.cart_count(), model.values().sum::<u32>());
				assert_eq!(store.restaurant_id().is_some(), !model.is_empty());
			}

			let expected = store.state().clone();
			drop(store);
			assert_eq!(empty_store(storage).await.state(), &expected);
		}
	}

	#[tokio::test]
	async fn test_rehydrate_reproduces_cart() {
		let storage = memory_storage();
		let mut store = empty_store(storage.clone()).await;
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(2, 250), "r1").await.unwrap();
		store.update_quantity(2, 3).await.unwrap();
		let expected = store.state().clone();
		drop(store);

		let reloaded = empty_store(storage).await;
		assert_eq!(reloaded.state(), &expected);
	}

	#[tokio::test]
	async fn test_load_repairs_inconsistent_snapshot() {
		let storage = memory_storage();
		let mut duplicate = CartItem::new(product(1, 1000));
		duplicate.quantity = 2;
		let mut zero = CartItem::new(product(2, 1000));
		zero.quantity = 0;
		storage
			.store(
				"cart",
				CART_ITEMS_ID,
				&vec![CartItem::new(product(1, 1000)), duplicate, zero],
			)
			.await
			.unwrap();
		storage
			.store("cart", CART_RESTAURANT_ID, &"r1".to_string())
			.await
			.unwrap();

		let store = empty_store(storage.clone()).await;
		assert_eq!(store.items().len(), 1);
		assert_eq!(store.items()[0].quantity, 3);

		let persisted: Vec<CartItem> = storage.retrieve("cart", CART_ITEMS_ID).await.unwrap();
		assert_eq!(persisted, store.items());
	}

	#[tokio::test]
	async fn test_load_discards_items_without_restaurant() {
		let storage = memory_storage();
		storage
			.store("cart", CART_ITEMS_ID, &vec![CartItem::new(product(1, 1000))])
			.await
			.unwrap();

		let store = empty_store(storage.clone()).await;
		assert!(store.is_empty());
		assert!(!storage.exists("cart", CART_ITEMS_ID).await.unwrap());
	}

	#[tokio::test]
	async fn test_load_tolerates_corrupt_json() {
		let backend = MemoryStorage::new();
		backend
			.set_bytes("cart:items", b"{not json".to_vec(), None)
			.await
			.unwrap();
		let store = empty_store(Arc::new(StorageService::new(Box::new(backend)))).await;
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn test_storage_failure_leaves_cart_untouched() {
		let mut backend = MockStorage::new();
		backend
			.expect_get_bytes()
			.returning(|_| Err(StorageError::NotFound));
		backend
			.expect_set_bytes()
			.returning(|_, _, _| Err(StorageError::Backend("disk full".into())));
		let mut store = empty_store(Arc::new(StorageService::new(Box::new(backend)))).await;

		let result = store.add_to_cart(product(1, 1000), "r1").await;

		assert!(matches!(result, Err(CartError::Storage(_))));
		assert!(store.is_empty());
		assert_eq!(store.restaurant_id(), None);
	}

	#[tokio::test]
	async fn test_cart_survives_restart_on_file_storage() {
		use umeal_storage::implementations::file::{FileStorage, TtlConfig};

		let dir = tempfile::tempdir().unwrap();
		let file_storage = || {
			Arc::new(StorageService::new(Box::new(FileStorage::new(
				dir.path().to_path_buf(),
				TtlConfig::default(),
			))))
		};

		let mut store = empty_store(file_storage()).await;
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		store.add_to_cart(product(1, 1000), "r1").await.unwrap();
		drop(store);

		let mut reloaded = empty_store(file_storage()).await;
		assert_eq!(reloaded.cart_count(), 2);
		assert_eq!(reloaded.restaurant_id(), Some("r1"));

		reloaded.clear_cart().await.unwrap();
		let emptied = empty_store(file_storage()).await;
		assert!(emptied.is_empty());
		assert!(emptied.restaurant_id().is_none());
	}
}
