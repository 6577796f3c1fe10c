//! Remote API access for the uMeal client.
//!
//! The REST API is an external collaborator: it authenticates users, persists
//! orders and owns the catalog. This crate defines the [`BackendInterface`]
//! every endpoint goes through, an HTTP implementation built on `reqwest`,
//! and an in-memory implementation for offline use and tests.

use async_trait::async_trait;
use thiserror::Error;
use umeal_config::ApiConfig;
use umeal_types::{
	AddressInput, Category, ConfigSchema, DeliveryAddress, ImplementationRegistry,
	NewOrderRequest, NewProduct, NewRestaurant, Order, OrderStatus, PostalCodeInfo, Product,
	ProfileUpdate, Restaurant, UserProfile,
};

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Message shown when the API rejects a request without explaining why.
pub const DEFAULT_ERROR_MESSAGE: &str = "Ocorreu um erro na requisição.";

/// Errors that can occur while talking to the remote API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
	/// The server answered with a non-success status.
	#[error("{message} (HTTP {status})")]
	Http { status: u16, message: String },
	/// The request never produced a response.
	#[error("Network error: {0}")]
	Network(String),
	/// The response body did not match the expected shape.
	#[error("Decode error: {0}")]
	Decode(String),
	/// An endpoint that must return a body returned nothing.
	#[error("Empty response from {0}")]
	EmptyResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl ApiError {
	/// Message suitable for showing to the user.
	pub fn user_message(&self) -> String {
		match self {
			ApiError::Http { message, .. } => message.clone(),
			other => other.to_string(),
		}
	}
}

/// Every remote operation the client performs.
///
/// List endpoints answer an empty body with an empty list. Single-entity
/// endpoints treat an empty body as [`ApiError::EmptyResponse`].
#[async_trait]
pub trait BackendInterface: Send + Sync {
	/// Returns the configuration schema for this backend implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// `GET /restaurants`
	async fn list_restaurants(&self) -> Result<Vec<Restaurant>, ApiError>;

	/// `GET /restaurants/{id}`
	async fn get_restaurant(&self, restaurant_id: &str) -> Result<Restaurant, ApiError>;

	/// `GET /restaurants/{id}/products`
	async fn list_products(&self, restaurant_id: &str) -> Result<Vec<Product>, ApiError>;

	/// `POST /restaurants/{id}/products`
	async fn create_product(
		&self,
		restaurant_id: &str,
		product: &NewProduct,
	) -> Result<(), ApiError>;

	/// `DELETE /products/{id}`
	async fn delete_product(&self, product_id: i64) -> Result<(), ApiError>;

	/// `GET /categories`
	async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;

	/// `GET /orders`, the signed-in customer's order history.
	async fn list_my_orders(&self) -> Result<Vec<Order>, ApiError>;

	/// `GET /restaurants/{id}/orders`
	async fn list_restaurant_orders(&self, restaurant_id: &str) -> Result<Vec<Order>, ApiError>;

	/// `PUT /orders/{id}/status`
	async fn update_order_status(
		&self,
		order_id: &str,
		status: &OrderStatus,
	) -> Result<(), ApiError>;

	/// `POST /orders`
	async fn create_order(&self, request: &NewOrderRequest) -> Result<(), ApiError>;

	/// `GET /users/me`
	async fn current_user(&self) -> Result<UserProfile, ApiError>;

	/// `GET /restaurants/my-restaurant`
	async fn my_restaurant(&self) -> Result<Restaurant, ApiError>;

	/// `GET /addresses/me`
	async fn my_addresses(&self) -> Result<Vec<DeliveryAddress>, ApiError>;

	/// `POST /addresses`, returning the stored address with its new id.
	async fn create_address(&self, address: &AddressInput) -> Result<DeliveryAddress, ApiError>;

	/// `PUT /addresses/{id}`
	async fn update_address(&self, address_id: i64, address: &AddressInput)
		-> Result<(), ApiError>;

	/// `DELETE /addresses/{id}`
	async fn delete_address(&self, address_id: i64) -> Result<(), ApiError>;

	/// `GET /addresses/cep/{cep}`, with `cep` as 8 digits.
	async fn lookup_postal_code(&self, cep: &str) -> Result<PostalCodeInfo, ApiError>;

	/// `PUT /users/me`
	async fn update_profile(&self, profile: &ProfileUpdate) -> Result<(), ApiError>;

	/// `POST /restaurants`
	async fn create_restaurant(&self, restaurant: &NewRestaurant) -> Result<(), ApiError>;
}

/// Type alias for backend factory functions.
///
/// Factories receive their own `[backend.implementations.<name>]` table and
/// the shared `[api]` section.
pub type BackendFactory =
	fn(&toml::Value, &ApiConfig) -> Result<Box<dyn BackendInterface>, ApiError>;

/// Registry trait for backend implementations.
pub trait BackendRegistry: ImplementationRegistry<Factory = BackendFactory> {}

/// Get all registered backend implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, BackendFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Entry point the core components use to reach the API.
pub struct BackendService {
	backend: Box<dyn BackendInterface>,
}

impl BackendService {
	pub fn new(backend: Box<dyn BackendInterface>) -> Self {
		Self { backend }
	}

	pub async fn list_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
		self.backend.list_restaurants().await
	}

	pub async fn get_restaurant(&self, restaurant_id: &str) -> Result<Restaurant, ApiError> {
		self.backend.get_restaurant(restaurant_id).await
	}

	pub async fn list_products(&self, restaurant_id: &str) -> Result<Vec<Product>, ApiError> {
		self.backend.list_products(restaurant_id).await
	}

	pub async fn create_product(
		&self,
		restaurant_id: &str,
		product: &NewProduct,
	) -> Result<(), ApiError> {
		tracing::debug!(restaurant_id = %restaurant_id, name = %product.name, "Creating product");
		self.backend.create_product(restaurant_id, product).await
	}

	pub async fn delete_product(&self, product_id: i64) -> Result<(), ApiError> {
		tracing::debug!(product_id, "Deleting product");
		self.backend.delete_product(product_id).await
	}

	pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
		self.backend.list_categories().await
	}

	pub async fn list_my_orders(&self) -> Result<Vec<Order>, ApiError> {
		self.backend.list_my_orders().await
	}

	pub async fn list_restaurant_orders(
		&self,
		restaurant_id: &str,
	) -> Result<Vec<Order>, ApiError> {
		self.backend.list_restaurant_orders(restaurant_id).await
	}

	pub async fn update_order_status(
		&self,
		order_id: &str,
		status: &OrderStatus,
	) -> Result<(), ApiError> {
		tracing::debug!(order_id = %order_id, status = %status, "Updating order status");
		self.backend.update_order_status(order_id, status).await
	}

	pub async fn create_order(&self, request: &NewOrderRequest) -> Result<(), ApiError> {
		tracing::debug!(
			restaurant_id = %request.restaurant_id,
			items = request.items.len(),
			"Submitting order"
		);
		self.backend.create_order(request).await
	}

	pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
		self.backend.current_user().await
	}

	pub async fn my_restaurant(&self) -> Result<Restaurant, ApiError> {
		self.backend.my_restaurant().await
	}

	pub async fn my_addresses(&self) -> Result<Vec<DeliveryAddress>, ApiError> {
		self.backend.my_addresses().await
	}

	pub async fn create_address(
		&self,
		address: &AddressInput,
	) -> Result<DeliveryAddress, ApiError> {
		tracing::debug!(zip_code = %address.zip_code, "Creating address");
		self.backend.create_address(address).await
	}

	pub async fn update_address(
		&self,
		address_id: i64,
		address: &AddressInput,
	) -> Result<(), ApiError> {
		tracing::debug!(address_id, "Updating address");
		self.backend.update_address(address_id, address).await
	}

	pub async fn delete_address(&self, address_id: i64) -> Result<(), ApiError> {
		tracing::debug!(address_id, "Deleting address");
		self.backend.delete_address(address_id).await
	}

	pub async fn lookup_postal_code(&self, cep: &str) -> Result<PostalCodeInfo, ApiError> {
		self.backend.lookup_postal_code(cep).await
	}

	pub async fn update_profile(&self, profile: &ProfileUpdate) -> Result<(), ApiError> {
		tracing::debug!("Updating profile");
		self.backend.update_profile(profile).await
	}

	pub async fn create_restaurant(&self, restaurant: &NewRestaurant) -> Result<(), ApiError> {
		tracing::debug!(
			name = %restaurant.restaurant_name,
			address_id = restaurant.address_id,
			"Creating restaurant"
		);
		self.backend.create_restaurant(restaurant).await
	}
}
