//! In-memory backend.
//!
//! Serves the API surface from a [`Fixture`] held in memory, optionally seeded
//! from a JSON file. Writes (new orders, status changes, product edits) are
//! applied to the fixture so the client can be exercised end to end without a
//! server. Tests use [`MemoryBackend::fail_next`] to inject API failures.

use crate::{ApiError, BackendFactory, BackendInterface, BackendRegistry};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use umeal_config::ApiConfig;
use umeal_types::{
	AddressInput, Category, ConfigSchema, DeliveryAddress, Field, FieldType,
	ImplementationRegistry, NewOrderRequest, NewProduct, NewRestaurant, Order, OrderItem,
	OrderStatus, PostalCodeInfo, Product, ProfileUpdate, Restaurant, Schema, UserProfile,
	ValidationError,
};

/// Data served by [`MemoryBackend`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixture {
	pub restaurants: Vec<Restaurant>,
	/// Menus keyed by restaurant id.
	pub products: HashMap<String, Vec<Product>>,
	pub categories: Vec<Category>,
	/// Incoming orders keyed by restaurant id.
	pub orders: HashMap<String, Vec<Order>>,
	/// Order history of the signed-in customer.
	pub my_orders: Vec<Order>,
	pub user: Option<UserProfile>,
	/// Restaurant owned by the signed-in user, if any.
	pub my_restaurant_id: Option<String>,
	pub addresses: Vec<DeliveryAddress>,
	/// Postal code lookups keyed by the 8-digit CEP.
	pub postal_codes: HashMap<String, PostalCodeInfo>,
}

fn not_found(message: &str) -> ApiError {
	ApiError::Http {
		status: 404,
		message: message.to_string(),
	}
}

fn bad_request(message: &str) -> ApiError {
	ApiError::Http {
		status: 400,
		message: message.to_string(),
	}
}

/// Backend answering from memory.
#[derive(Clone, Default)]
pub struct MemoryBackend {
	data: Arc<RwLock<Fixture>>,
	failure: Arc<Mutex<Option<ApiError>>>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_fixture(fixture: Fixture) -> Self {
		Self {
			data: Arc::new(RwLock::new(fixture)),
			failure: Arc::default(),
		}
	}

	/// Makes the next call fail with `error`, without touching any data.
	pub async fn fail_next(&self, error: ApiError) {
		*self.failure.lock().await = Some(error);
	}

	/// Snapshot of the current data.
	pub async fn fixture(&self) -> Fixture {
		self.data.read().await.clone()
	}

	async fn check_failure(&self) -> Result<(), ApiError> {
		match self.failure.lock().await.take() {
			Some(error) => Err(error),
			None => Ok(()),
		}
	}
}

fn find_restaurant<'a>(data: &'a Fixture, restaurant_id: &str) -> Result<&'a Restaurant, ApiError> {
	data.restaurants
		.iter()
		.find(|r| r.id == restaurant_id)
		.ok_or_else(|| not_found("Restaurante não encontrado."))
}

fn unauthenticated() -> ApiError {
	ApiError::Http {
		status: 401,
		message: "Usuário não autenticado.".to_string(),
	}
}

fn stored_address(id: i64, input: &AddressInput) -> DeliveryAddress {
	DeliveryAddress {
		id,
		street: input.street.clone(),
		number: input.number.clone(),
		neighborhood: input.neighborhood.clone(),
		city: input.city.clone(),
		state: input.state.clone(),
		zip_code: input.zip_code.clone(),
		latitude: input.latitude,
		longitude: input.longitude,
	}
}

fn next_order_id(data: &Fixture) -> String {
	let max = data
		.orders
		.values()
		.flatten()
		.chain(data.my_orders.iter())
		.filter_map(|o| o.id.parse::<u64>().ok())
		.max()
		.unwrap_or(0);
	(max + 1).to_string()
}

#[async_trait]
impl BackendInterface for MemoryBackend {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryBackendSchema)
	}

	async fn list_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
		self.check_failure().await?;
		Ok(self.data.read().await.restaurants.clone())
	}

	async fn get_restaurant(&self, restaurant_id: &str) -> Result<Restaurant, ApiError> {
		self.check_failure().await?;
		let data = self.data.read().await;
		find_restaurant(&data, restaurant_id).cloned()
	}

	async fn list_products(&self, restaurant_id: &str) -> Result<Vec<Product>, ApiError> {
		self.check_failure().await?;
		let data = self.data.read().await;
		Ok(data.products.get(restaurant_id).cloned().unwrap_or_default())
	}

	async fn create_product(
		&self,
		restaurant_id: &str,
		product: &NewProduct,
	) -> Result<(), ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;
		find_restaurant(&data, restaurant_id)?;

		let id = data
			.products
			.values()
			.flatten()
			.map(|p| p.id)
			.max()
			.unwrap_or(0) + 1;
		data.products
			.entry(restaurant_id.to_string())
			.or_default()
			.push(Product {
				id,
				name: product.name.clone(),
				price: product.price,
				description: product.description.clone(),
				category_id: Some(product.category_id),
				image_url: Some(product.image_url.clone()).filter(|url| !url.is_empty()),
			});
		Ok(())
	}

	async fn delete_product(&self, product_id: i64) -> Result<(), ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;
		for menu in data.products.values_mut() {
			if let Some(pos) = menu.iter().position(|p| p.id == product_id) {
				menu.remove(pos);
				return Ok(());
			}
		}
		Err(not_found("Produto não encontrado."))
	}

	async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
		self.check_failure().await?;
		Ok(self.data.read().await.categories.clone())
	}

	async fn list_my_orders(&self) -> Result<Vec<Order>, ApiError> {
		self.check_failure().await?;
		Ok(self.data.read().await.my_orders.clone())
	}

	async fn list_restaurant_orders(&self, restaurant_id: &str) -> Result<Vec<Order>, ApiError> {
		self.check_failure().await?;
		let data = self.data.read().await;
		Ok(data.orders.get(restaurant_id).cloned().unwrap_or_default())
	}

	async fn update_order_status(
		&self,
		order_id: &str,
		status: &OrderStatus,
	) -> Result<(), ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;
		let mut found = false;
		for order in data
			.orders
			.values_mut()
			.flatten()
			.filter(|o| o.id == order_id)
		{
			order.status = status.clone();
			found = true;
		}
		if !found {
			return Err(not_found("Pedido não encontrado."));
		}
		for order in data.my_orders.iter_mut().filter(|o| o.id == order_id) {
			order.status = status.clone();
		}
		Ok(())
	}

	async fn create_order(&self, request: &NewOrderRequest) -> Result<(), ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;

		if request.items.is_empty() {
			return Err(bad_request("O pedido deve conter ao menos um item."));
		}
		let restaurant_name = find_restaurant(&data, &request.restaurant_id)?
			.restaurant_name
			.clone();
		let address = data
			.addresses
			.iter()
			.find(|a| a.id == request.delivery_address_id)
			.cloned()
			.ok_or_else(|| bad_request("Endereço de entrega inválido."))?;

		let menu = data
			.products
			.get(&request.restaurant_id)
			.map(Vec::as_slice)
			.unwrap_or_default();
		let items = request
			.items
			.iter()
			.map(|line| {
				menu.iter()
					.find(|p| p.id == line.product_id)
					.map(|p| OrderItem {
						product_name: p.name.clone(),
						quantity: line.quantity,
						unit_price: p.price,
					})
					.ok_or_else(|| bad_request("Produto não encontrado."))
			})
			.collect::<Result<Vec<_>, _>>()?;
		let total_price = items
			.iter()
			.map(|i| i.unit_price * Decimal::from(i.quantity))
			.sum();

		let order = Order {
			id: next_order_id(&data),
			customer_name: data
				.user
				.as_ref()
				.map(|u| u.name.clone())
				.unwrap_or_default(),
			restaurant_name: Some(restaurant_name),
			items,
			total_price,
			status: OrderStatus::Pending,
			created_at: chrono::Utc::now().to_rfc3339(),
			delivery_address: Some(address),
		};

		data.my_orders.push(order.clone());
		data.orders
			.entry(request.restaurant_id.clone())
			.or_default()
			.push(Order {
				restaurant_name: None,
				..order
			});
		Ok(())
	}

	async fn current_user(&self) -> Result<UserProfile, ApiError> {
		self.check_failure().await?;
		self.data
			.read()
			.await
			.user
			.clone()
			.ok_or_else(unauthenticated)
	}

	async fn my_restaurant(&self) -> Result<Restaurant, ApiError> {
		self.check_failure().await?;
		let data = self.data.read().await;
		let restaurant_id = data
			.my_restaurant_id
			.as_deref()
			.ok_or_else(|| not_found("Restaurante não encontrado."))?;
		find_restaurant(&data, restaurant_id).cloned()
	}

	async fn my_addresses(&self) -> Result<Vec<DeliveryAddress>, ApiError> {
		self.check_failure().await?;
		Ok(self.data.read().await.addresses.clone())
	}

	async fn create_address(&self, address: &AddressInput) -> Result<DeliveryAddress, ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;
		let id = data.addresses.iter().map(|a| a.id).max().unwrap_or(0) + 1;
		let stored = stored_address(id, address);
		data.addresses.push(stored.clone());
		Ok(stored)
	}

	async fn update_address(
		&self,
		address_id: i64,
		address: &AddressInput,
	) -> Result<(), ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;
		let existing = data
			.addresses
			.iter_mut()
			.find(|a| a.id == address_id)
			.ok_or_else(|| not_found("Endereço não encontrado."))?;
		*existing = stored_address(address_id, address);
		Ok(())
	}

	async fn delete_address(&self, address_id: i64) -> Result<(), ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;
		let before = data.addresses.len();
		data.addresses.retain(|a| a.id != address_id);
		if data.addresses.len() == before {
			return Err(not_found("Endereço não encontrado."));
		}
		Ok(())
	}

	async fn lookup_postal_code(&self, cep: &str) -> Result<PostalCodeInfo, ApiError> {
		self.check_failure().await?;
		self.data
			.read()
			.await
			.postal_codes
			.get(cep)
			.cloned()
			.ok_or_else(|| not_found("CEP não encontrado."))
	}

	async fn update_profile(&self, profile: &ProfileUpdate) -> Result<(), ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;
		let user = data.user.as_mut().ok_or_else(unauthenticated)?;
		user.name = profile.name.clone();
		user.email = profile.email.clone();
		Ok(())
	}

	async fn create_restaurant(&self, restaurant: &NewRestaurant) -> Result<(), ApiError> {
		self.check_failure().await?;
		let mut data = self.data.write().await;
		if data.user.is_none() {
			return Err(unauthenticated());
		}
		if data.my_restaurant_id.is_some() {
			return Err(ApiError::Http {
				status: 409,
				message: "Usuário já possui um restaurante.".to_string(),
			});
		}
		let address = data
			.addresses
			.iter()
			.find(|a| a.id == restaurant.address_id)
			.cloned()
			.ok_or_else(|| bad_request("Endereço inválido."))?;
		let categories = data
			.categories
			.iter()
			.filter(|c| restaurant.category_ids.contains(&c.id))
			.cloned()
			.collect();

		let id = data
			.restaurants
			.iter()
			.filter_map(|r| r.id.parse::<u64>().ok())
			.max()
			.unwrap_or(0) + 1;
		data.restaurants.push(Restaurant {
			id: id.to_string(),
			restaurant_name: restaurant.restaurant_name.clone(),
			categories,
			description: None,
			address: Some(address),
		});
		data.my_restaurant_id = Some(id.to_string());
		Ok(())
	}
}

/// Configuration schema for MemoryBackend.
pub struct MemoryBackendSchema;

impl ConfigSchema for MemoryBackendSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::new("fixture_path", FieldType::String)]).validate(config)
	}
}

/// Factory function to create a memory backend from configuration.
///
/// Configuration parameters:
/// - `fixture_path`: JSON file with the initial [`Fixture`] (default: empty)
pub fn create_backend(
	config: &toml::Value,
	_api: &ApiConfig,
) -> Result<Box<dyn BackendInterface>, ApiError> {
	MemoryBackendSchema
		.validate(config)
		.map_err(|e| ApiError::Configuration(e.to_string()))?;

	let fixture = match config.get("fixture_path").and_then(|v| v.as_str()) {
		Some(path) => {
			let content = std::fs::read_to_string(path).map_err(|e| {
				ApiError::Configuration(format!("Cannot read fixture {}: {}", path, e))
			})?;
			serde_json::from_str(&content).map_err(|e| {
				ApiError::Configuration(format!("Invalid fixture {}: {}", path, e))
			})?
		},
		None => Fixture::default(),
	};

	Ok(Box::new(MemoryBackend::with_fixture(fixture)))
}

/// Registry for the memory backend implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = BackendFactory;

	fn factory() -> Self::Factory {
		create_backend
	}
}

impl BackendRegistry for Registry {}
