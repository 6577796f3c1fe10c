//! Request and error body types for the uMeal HTTP API.

use crate::utils::digits_only;
use crate::{CartItem, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
	pub restaurant_id: String,
	pub delivery_address_id: i64,
	pub items: Vec<NewOrderItem>,
}

/// One line of a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
	pub product_id: i64,
	pub quantity: u32,
}

impl NewOrderRequest {
	/// Builds an order request from cart contents.
	pub fn from_cart(restaurant_id: &str, delivery_address_id: i64, items: &[CartItem]) -> Self {
		Self {
			restaurant_id: restaurant_id.to_string(),
			delivery_address_id,
			items: items
				.iter()
				.map(|item| NewOrderItem {
					product_id: item.product.id,
					quantity: item.quantity,
				})
				.collect(),
		}
	}
}

/// Body of `PUT /orders/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
	pub status: OrderStatus,
}

/// Body of `POST /restaurants/{id}/products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
	pub name: String,
	pub description: String,
	pub price: Decimal,
	pub category_id: i64,
	#[serde(default)]
	pub image_url: String,
}

/// Body of `POST /addresses` and `PUT /addresses/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
	pub street: String,
	pub number: String,
	pub neighborhood: String,
	pub city: String,
	pub state: String,
	/// Digits only on the wire.
	pub zip_code: String,
	pub latitude: f64,
	pub longitude: f64,
}

impl AddressInput {
	/// Whether any field a postal code lookup can supply is still blank.
	pub fn needs_lookup(&self) -> bool {
		[&self.street, &self.neighborhood, &self.city, &self.state]
			.iter()
			.any(|f| f.trim().is_empty())
	}

	/// Fills blank street, neighborhood, city and state from a lookup result.
	/// Fields the user already typed are kept.
	pub fn fill_from(&mut self, info: &PostalCodeInfo) {
		for (field, value) in [
			(&mut self.street, &info.street),
			(&mut self.neighborhood, &info.neighborhood),
			(&mut self.city, &info.city),
			(&mut self.state, &info.state),
		] {
			if field.trim().is_empty() {
				*field = value.clone();
			}
		}
	}

	/// Copy with the postal code stripped to digits and text fields trimmed.
	pub fn normalised(&self) -> Self {
		Self {
			street: self.street.trim().to_string(),
			number: self.number.trim().to_string(),
			neighborhood: self.neighborhood.trim().to_string(),
			city: self.city.trim().to_string(),
			state: self.state.trim().to_string(),
			zip_code: digits_only(&self.zip_code),
			latitude: self.latitude,
			longitude: self.longitude,
		}
	}
}

/// Response of `GET /addresses/cep/{cep}`, in the postal service's field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostalCodeInfo {
	#[serde(rename = "logradouro")]
	pub street: String,
	#[serde(rename = "bairro")]
	pub neighborhood: String,
	#[serde(rename = "localidade")]
	pub city: String,
	#[serde(rename = "uf")]
	pub state: String,
}

/// Body of `PUT /users/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
	pub name: String,
	pub email: String,
}

/// Body of `POST /restaurants`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRestaurant {
	pub restaurant_name: String,
	/// Digits only.
	pub cnpj: String,
	pub category_ids: Vec<i64>,
	pub address_id: i64,
}

/// Error body returned by the API on non-success responses. Other fields
/// are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
	#[serde(default)]
	pub message: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Product;

	#[test]
	fn test_order_request_wire_format() {
		let items = vec![CartItem {
			product: Product {
				id: 5,
				name: "Pizza".into(),
				price: Decimal::new(1000, 2),
				description: String::new(),
				category_id: None,
				image_url: None,
			},
			quantity: 2,
		}];
		let request = NewOrderRequest::from_cart("r1", 9, &items);
		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"restaurantId": "r1",
				"deliveryAddressId": 9,
				"items": [{"productId": 5, "quantity": 2}]
			})
		);
	}

	#[test]
	fn test_postal_code_fills_only_blank_fields() {
		let info: PostalCodeInfo = serde_json::from_str(
			r#"{"cep":"01001-000","logradouro":"Praça da Sé","bairro":"Sé","localidade":"São Paulo","uf":"SP"}"#,
		)
		.unwrap();
		let mut input = AddressInput {
			street: "Rua Nova".into(),
			number: "10".into(),
			zip_code: "01001-000".into(),
			..Default::default()
		};
		assert!(input.needs_lookup());

		input.fill_from(&info);

		assert_eq!(input.street, "Rua Nova");
		assert_eq!(input.neighborhood, "Sé");
		assert_eq!(input.city, "São Paulo");
		assert_eq!(input.state, "SP");
		assert!(!input.needs_lookup());
		assert_eq!(input.normalised().zip_code, "01001000");
	}

	#[test]
	fn test_new_restaurant_wire_format() {
		let body = NewRestaurant {
			restaurant_name: "Cantina".into(),
			cnpj: "12345678000199".into(),
			category_ids: vec![5],
			address_id: 8,
		};
		assert_eq!(
			serde_json::to_value(&body).unwrap(),
			serde_json::json!({
				"restaurantName": "Cantina",
				"cnpj": "12345678000199",
				"categoryIds": [5],
				"addressId": 8
			})
		);
	}

	#[test]
	fn test_status_update_wire_format() {
		let body = StatusUpdateRequest {
			status: OrderStatus::OutForDelivery,
		};
		assert_eq!(
			serde_json::to_string(&body).unwrap(),
			r#"{"status":"OUT_FOR_DELIVERY"}"#
		);
	}
}
