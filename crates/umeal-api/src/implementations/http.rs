//! HTTP backend for the uMeal REST API.
//!
//! All endpoints go through [`HttpBackend::request`], which joins the path to
//! the configured base URL, attaches the bearer token when one is configured,
//! and turns non-success responses into [`ApiError::Http`] carrying the
//! server's `message`.

use crate::{
	ApiError, BackendFactory, BackendInterface, BackendRegistry, DEFAULT_ERROR_MESSAGE,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use umeal_config::ApiConfig;
use umeal_types::{
	AddressInput, Category, ConfigSchema, DeliveryAddress, ErrorResponse, Field, FieldType,
	ImplementationRegistry, NewOrderRequest, NewProduct, NewRestaurant, Order, OrderStatus,
	PostalCodeInfo, Product, ProfileUpdate, Restaurant, Schema, SecretString,
	StatusUpdateRequest, UserProfile, ValidationError,
};

/// Joins a base URL and an endpoint path with exactly one slash between them.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
	format!(
		"{}/{}",
		base_url.trim_end_matches('/'),
		path.trim_start_matches('/')
	)
}

/// Extracts the user-facing message from an error body.
///
/// Uses the body's `message` field when present and non-empty, otherwise the
/// generic request error message.
pub(crate) fn error_message(body: &str) -> String {
	serde_json::from_str::<ErrorResponse>(body)
		.ok()
		.and_then(|e| e.message)
		.filter(|m| !m.trim().is_empty())
		.unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}

/// Decodes a success body. An empty body or a JSON `null` yields `None`.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<Option<T>, ApiError> {
	if body.trim().is_empty() {
		return Ok(None);
	}
	serde_json::from_str::<Option<T>>(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn to_body<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
	serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// reqwest-backed implementation of [`BackendInterface`].
pub struct HttpBackend {
	client: reqwest::Client,
	base_url: String,
	token: Option<SecretString>,
}

impl HttpBackend {
	pub fn new(
		base_url: impl Into<String>,
		token: Option<SecretString>,
		timeout: Duration,
	) -> Result<Self, ApiError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.pool_idle_timeout(Duration::from_secs(90))
			.build()
			.map_err(|e| ApiError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url: base_url.into(),
			token: token.filter(|t| !t.is_empty()),
		})
	}

	fn build_request(
		&self,
		method: Method,
		path: &str,
		body: Option<&serde_json::Value>,
	) -> Result<reqwest::Request, ApiError> {
		let mut builder = self
			.client
			.request(method, join_url(&self.base_url, path))
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json");

		if let Some(token) = &self.token {
			builder = builder.bearer_auth(token.expose_secret());
		}
		if let Some(body) = body {
			builder = builder.json(body);
		}

		builder
			.build()
			.map_err(|e| ApiError::Configuration(e.to_string()))
	}

	/// Performs a request and decodes the response body.
	///
	/// Returns `Ok(None)` when the server answers with an empty body.
	pub async fn request<T: DeserializeOwned>(
		&self,
		method: Method,
		path: &str,
		body: Option<&serde_json::Value>,
	) -> Result<Option<T>, ApiError> {
		let request = self.build_request(method.clone(), path, body)?;
		tracing::debug!(method = %method, path = %path, "API request");

		let response = self
			.client
			.execute(request)
			.await
			.map_err(|e| ApiError::Network(e.to_string()))?;

		let status = response.status();
		let text = response
			.text()
			.await
			.map_err(|e| ApiError::Network(e.to_string()))?;

		if !status.is_success() {
			let message = error_message(&text);
			tracing::warn!(
				method = %method,
				path = %path,
				status = status.as_u16(),
				"API request failed: {}",
				message
			);
			return Err(ApiError::Http {
				status: status.as_u16(),
				message,
			});
		}

		decode_body(&text)
	}

	async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
		Ok(self
			.request::<Vec<T>>(Method::GET, path, None)
			.await?
			.unwrap_or_default())
	}

	async fn get_one<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
		self.request::<T>(Method::GET, path, None)
			.await?
			.ok_or_else(|| ApiError::EmptyResponse(path.to_string()))
	}

	/// Sends a request whose response body, if any, is not needed.
	async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<&serde_json::Value>,
	) -> Result<(), ApiError> {
		self.request::<serde_json::Value>(method, path, body)
			.await
			.map(|_| ())
	}
}

#[async_trait]
impl BackendInterface for HttpBackend {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpBackendSchema)
	}

	async fn list_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
		self.get_list("/restaurants").await
	}

	async fn get_restaurant(&self, restaurant_id: &str) -> Result<Restaurant, ApiError> {
		self.get_one(&format!("/restaurants/{}", restaurant_id))
			.await
	}

	async fn list_products(&self, restaurant_id: &str) -> Result<Vec<Product>, ApiError> {
		self.get_list(&format!("/restaurants/{}/products", restaurant_id))
			.await
	}

	async fn create_product(
		&self,
		restaurant_id: &str,
		product: &NewProduct,
	) -> Result<(), ApiError> {
		let body = to_body(product)?;
		self.send(
			Method::POST,
			&format!("/restaurants/{}/products", restaurant_id),
			Some(&body),
		)
		.await
	}

	async fn delete_product(&self, product_id: i64) -> Result<(), ApiError> {
		self.send(Method::DELETE, &format!("/products/{}", product_id), None)
			.await
	}

	async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
		self.get_list("/categories").await
	}

	async fn list_my_orders(&self) -> Result<Vec<Order>, ApiError> {
		self.get_list("/orders").await
	}

	async fn list_restaurant_orders(&self, restaurant_id: &str) -> Result<Vec<Order>, ApiError> {
		self.get_list(&format!("/restaurants/{}/orders", restaurant_id))
			.await
	}

	async fn update_order_status(
		&self,
		order_id: &str,
		status: &OrderStatus,
	) -> Result<(), ApiError> {
		let body = to_body(&StatusUpdateRequest {
			status: status.clone(),
		})?;
		self.send(
			Method::PUT,
			&format!("/orders/{}/status", order_id),
			Some(&body),
		)
		.await
	}

	async fn create_order(&self, request: &NewOrderRequest) -> Result<(), ApiError> {
		let body = to_body(request)?;
		self.send(Method::POST, "/orders", Some(&body)).await
	}

	async fn current_user(&self) -> Result<UserProfile, ApiError> {
		self.get_one("/users/me").await
	}

	async fn my_restaurant(&self) -> Result<Restaurant, ApiError> {
		self.get_one("/restaurants/my-restaurant").await
	}

	async fn my_addresses(&self) -> Result<Vec<DeliveryAddress>, ApiError> {
		self.get_list("/addresses/me").await
	}

	async fn create_address(&self, address: &AddressInput) -> Result<DeliveryAddress, ApiError> {
		let body = to_body(address)?;
		self.request(Method::POST, "/addresses", Some(&body))
			.await?
			.ok_or_else(|| ApiError::EmptyResponse("/addresses".to_string()))
	}

	async fn update_address(
		&self,
		address_id: i64,
		address: &AddressInput,
	) -> Result<(), ApiError> {
		let body = to_body(address)?;
		self.send(
			Method::PUT,
			&format!("/addresses/{}", address_id),
			Some(&body),
		)
		.await
	}

	async fn delete_address(&self, address_id: i64) -> Result<(), ApiError> {
		self.send(Method::DELETE, &format!("/addresses/{}", address_id), None)
			.await
	}

	async fn lookup_postal_code(&self, cep: &str) -> Result<PostalCodeInfo, ApiError> {
		self.get_one(&format!("/addresses/cep/{}", cep)).await
	}

	async fn update_profile(&self, profile: &ProfileUpdate) -> Result<(), ApiError> {
		let body = to_body(profile)?;
		self.send(Method::PUT, "/users/me", Some(&body)).await
	}

	async fn create_restaurant(&self, restaurant: &NewRestaurant) -> Result<(), ApiError> {
		let body = to_body(restaurant)?;
		self.send(Method::POST, "/restaurants", Some(&body)).await
	}
}

/// Configuration schema for HttpBackend.
///
/// Both keys override the shared `[api]` section for this backend only.
pub struct HttpBackendSchema;

impl ConfigSchema for HttpBackendSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![
				Field::new("base_url", FieldType::Url),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		)
		.validate(config)
	}
}

/// Factory function to create an HTTP backend from configuration.
pub fn create_backend(
	config: &toml::Value,
	api: &ApiConfig,
) -> Result<Box<dyn BackendInterface>, ApiError> {
	HttpBackendSchema
		.validate(config)
		.map_err(|e| ApiError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.unwrap_or(api.base_url.as_str());
	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(api.timeout_seconds);

	Ok(Box::new(HttpBackend::new(
		base_url,
		api.bearer_token().cloned(),
		Duration::from_secs(timeout_seconds),
	)?))
}

/// Registry for the HTTP backend implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = BackendFactory;

	fn factory() -> Self::Factory {
		create_backend
	}
}

impl BackendRegistry for Registry {}
