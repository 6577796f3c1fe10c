//! Catalog: restaurants, menus and categories, plus the owner's menu
//! management.

use std::sync::Arc;
use thiserror::Error;
use umeal_api::{ApiError, BackendService};
use umeal_types::{Category, NewProduct, Order, Product, Restaurant, UserProfile};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("Backend error: {0}")]
	Backend(#[from] ApiError),
	#[error("Invalid product: {0}")]
	InvalidProduct(String),
}

/// Filters restaurants by name and category.
///
/// `query` matches case-insensitively anywhere in the restaurant name; an
/// empty query matches everything. `category` must equal one of the
/// restaurant's category names exactly.
pub fn filter_restaurants(
	restaurants: &[Restaurant],
	query: Option<&str>,
	category: Option<&str>,
) -> Vec<Restaurant> {
	let query = query.map(str::to_lowercase).unwrap_or_default();
	restaurants
		.iter()
		.filter(|r| r.restaurant_name.to_lowercase().contains(&query))
		.filter(|r| match category {
			Some(category) => r.categories.iter().any(|c| c.name == category),
			None => true,
		})
		.cloned()
		.collect()
}

pub struct Catalog {
	backend: Arc<BackendService>,
}

impl Catalog {
	pub fn new(backend: Arc<BackendService>) -> Self {
		Self { backend }
	}

	pub async fn restaurants(&self) -> Result<Vec<Restaurant>, CatalogError> {
		Ok(self.backend.list_restaurants().await?)
	}

	pub async fn restaurant(&self, restaurant_id: &str) -> Result<Restaurant, CatalogError> {
		Ok(self.backend.get_restaurant(restaurant_id).await?)
	}

	pub async fn menu(&self, restaurant_id: &str) -> Result<Vec<Product>, CatalogError> {
		Ok(self.backend.list_products(restaurant_id).await?)
	}

	pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
		Ok(self.backend.list_categories().await?)
	}

	/// The signed-in customer's orders, newest first.
	pub async fn my_orders(&self) -> Result<Vec<Order>, CatalogError> {
		let mut orders = self.backend.list_my_orders().await?;
		orders.sort_by(|a, b| b.placed_at().cmp(&a.placed_at()));
		Ok(orders)
	}

	pub async fn me(&self) -> Result<UserProfile, CatalogError> {
		Ok(self.backend.current_user().await?)
	}

	pub async fn my_restaurant(&self) -> Result<Restaurant, CatalogError> {
		Ok(self.backend.my_restaurant().await?)
	}

	/// Adds a product to a restaurant's menu.
	pub async fn create_product(
		&self,
		restaurant_id: &str,
		product: &NewProduct,
	) -> Result<(), CatalogError> {
		if product.name.trim().is_empty() {
			return Err(CatalogError::InvalidProduct("name is required".into()));
		}
		if product.price.is_sign_negative() {
			return Err(CatalogError::InvalidProduct(
				"price cannot be negative".into(),
			));
		}
		self.backend.create_product(restaurant_id, product).await?;
		tracing::info!(restaurant_id = %restaurant_id, name = %product.name, "Created product");
		Ok(())
	}

	pub async fn delete_product(&self, product_id: i64) -> Result<(), CatalogError> {
		self.backend.delete_product(product_id).await?;
		tracing::info!(product_id, "Deleted product");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;
	use umeal_api::implementations::memory::{Fixture, MemoryBackend};
	use umeal_types::OrderStatus;

	fn restaurant(id: &str, name: &str, categories: &[&str]) -> Restaurant {
		Restaurant {
			id: id.into(),
			restaurant_name: name.into(),
			categories: categories
				.iter()
				.enumerate()
				.map(|(i, c)| Category {
					id: i as i64,
					name: c.to_string(),
				})
				.collect(),
			description: None,
			address: None,
		}
	}

	fn restaurants() -> Vec<Restaurant> {
		vec![
			restaurant("1", "Cantina Italiana", &["Massas", "Pizza"]),
			restaurant("2", "Pizzaria Bella", &["Pizza"]),
			restaurant("3", "Sushi House", &["Japonesa"]),
		]
	}

	fn ids(list: &[Restaurant]) -> Vec<&str> {
		list.iter().map(|r| r.id.as_str()).collect()
	}

	#[test]
	fn test_filter_by_name_is_case_insensitive() {
		let list = restaurants();
		assert_eq!(ids(&filter_restaurants(&list, Some("PIZZ"), None)), vec!["2"]);
		assert_eq!(ids(&filter_restaurants(&list, Some(""), None)).len(), 3);
		assert_eq!(ids(&filter_restaurants(&list, None, None)).len(), 3);
	}

	#[test]
	fn test_filter_by_category_is_exact() {
		let list = restaurants();
		assert_eq!(
			ids(&filter_restaurants(&list, None, Some("Pizza"))),
			vec!["1", "2"]
		);
		assert!(filter_restaurants(&list, None, Some("pizza")).is_empty());
		assert_eq!(
			ids(&filter_restaurants(&list, Some("cantina"), Some("Pizza"))),
			vec!["1"]
		);
	}

	#[tokio::test]
	async fn test_my_orders_newest_first() {
		let order = |id: &str, created_at: &str| umeal_types::Order {
			id: id.into(),
			customer_name: String::new(),
			restaurant_name: None,
			items: vec![],
			total_price: Decimal::ZERO,
			status: OrderStatus::Delivered,
			created_at: created_at.into(),
			delivery_address: None,
		};
		let backend = MemoryBackend::with_fixture(Fixture {
			my_orders: vec![
				order("1", "2026-01-01T10:00:00"),
				order("2", "2026-03-01T10:00:00Z"),
			],
			..Default::default()
		});
		let catalog = Catalog::new(Arc::new(BackendService::new(Box::new(backend))));

		let orders = catalog.my_orders().await.unwrap();
		assert_eq!(orders[0].id, "2");
	}

	#[tokio::test]
	async fn test_create_product_validation() {
		let backend = MemoryBackend::with_fixture(Fixture {
			restaurants: restaurants(),
			..Default::default()
		});
		let catalog = Catalog::new(Arc::new(BackendService::new(Box::new(backend.clone()))));

		let mut product = NewProduct {
			name: "  ".into(),
			description: String::new(),
			price: Decimal::new(1000, 2),
			category_id: 1,
			image_url: String::new(),
		};
		assert!(matches!(
			catalog.create_product("1", &product).await,
			Err(CatalogError::InvalidProduct(_))
		));

		product.name = "Calzone".into();
		catalog.create_product("1", &product).await.unwrap();
		let menu = catalog.menu("1").await.unwrap();
		assert_eq!(menu.len(), 1);

		catalog.delete_product(menu[0].id).await.unwrap();
		assert!(catalog.menu("1").await.unwrap().is_empty());
	}
}
