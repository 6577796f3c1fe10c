//! mockall doubles shared by the component tests.

use async_trait::async_trait;
use mockall::mock;
use std::time::Duration;
use umeal_api::{ApiError, BackendInterface};
use umeal_storage::{StorageError, StorageInterface};
use umeal_types::{
	AddressInput, Category, ConfigSchema, DeliveryAddress, NewOrderRequest, NewProduct,
	NewRestaurant, Order, OrderStatus, PostalCodeInfo, Product, ProfileUpdate, Restaurant,
	UserProfile,
};

mock! {
	pub Backend {}

	#[async_trait]
	impl BackendInterface for Backend {
		fn config_schema(&self) -> Box<dyn ConfigSchema>;
		async fn list_restaurants(&self) -> Result<Vec<Restaurant>, ApiError>;
		async fn get_restaurant(&self, restaurant_id: &str) -> Result<Restaurant, ApiError>;
		async fn list_products(&self, restaurant_id: &str) -> Result<Vec<Product>, ApiError>;
		async fn create_product(&self, restaurant_id: &str, product: &NewProduct) -> Result<(), ApiError>;
		async fn delete_product(&self, product_id: i64) -> Result<(), ApiError>;
		async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;
		async fn list_my_orders(&self) -> Result<Vec<Order>, ApiError>;
		async fn list_restaurant_orders(&self, restaurant_id: &str) -> Result<Vec<Order>, ApiError>;
		async fn update_order_status(&self, order_id: &str, status: &OrderStatus) -> Result<(), ApiError>;
		async fn create_order(&self, request: &NewOrderRequest) -> Result<(), ApiError>;
		async fn current_user(&self) -> Result<UserProfile, ApiError>;
		async fn my_restaurant(&self) -> Result<Restaurant, ApiError>;
		async fn my_addresses(&self) -> Result<Vec<DeliveryAddress>, ApiError>;
		async fn create_address(&self, address: &AddressInput) -> Result<DeliveryAddress, ApiError>;
		async fn update_address(&self, address_id: i64, address: &AddressInput) -> Result<(), ApiError>;
		async fn delete_address(&self, address_id: i64) -> Result<(), ApiError>;
		async fn lookup_postal_code(&self, cep: &str) -> Result<PostalCodeInfo, ApiError>;
		async fn update_profile(&self, profile: &ProfileUpdate) -> Result<(), ApiError>;
		async fn create_restaurant(&self, restaurant: &NewRestaurant) -> Result<(), ApiError>;
	}
}

mock! {
	pub Storage {}

	#[async_trait]
	impl StorageInterface for Storage {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;
		async fn set_bytes(
			&self,
			key: &str,
			value: Vec<u8>,
			ttl: Option<Duration>,
		) -> Result<(), StorageError>;
		async fn delete(&self, key: &str) -> Result<(), StorageError>;
		async fn exists(&self, key: &str) -> Result<bool, StorageError>;
		fn config_schema(&self) -> Box<dyn ConfigSchema>;
	}
}

/// Storage that starts empty, accepts writes and fails every delete.
pub fn storage_failing_deletes() -> MockStorage {
	let mut storage = MockStorage::new();
	storage
		.expect_get_bytes()
		.returning(|_| Err(StorageError::NotFound));
	storage.expect_set_bytes().returning(|_, _, _| Ok(()));
	storage
		.expect_delete()
		.returning(|_| Err(StorageError::Backend("disk".into())));
	storage
}
