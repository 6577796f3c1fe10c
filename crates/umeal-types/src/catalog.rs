//! Catalog types returned by the remote API.
//!
//! Every optional field carries a serde default so partial payloads from the
//! API still decode into a renderable value.

use crate::utils::serde_helpers::string_or_number;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A menu item offered by a restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
	/// Unique within the owning restaurant's catalog.
	pub id: i64,
	pub name: String,
	/// Unit price, never negative.
	pub price: Decimal,
	#[serde(default)]
	pub description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category_id: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_url: Option<String>,
}

/// A food category used to tag restaurants and products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
	pub id: i64,
	pub name: String,
}

/// A restaurant as listed on the client home page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
	#[serde(deserialize_with = "string_or_number")]
	pub id: String,
	#[serde(default)]
	pub restaurant_name: String,
	#[serde(default)]
	pub categories: Vec<Category>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<DeliveryAddress>,
}

/// A postal address with coordinates, used for delivery and restaurant location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryAddress {
	pub id: i64,
	pub street: String,
	pub number: String,
	pub neighborhood: String,
	pub city: String,
	pub state: String,
	pub zip_code: String,
	pub latitude: f64,
	pub longitude: f64,
}

impl DeliveryAddress {
	/// One-line label shown in address pickers.
	pub fn label(&self) -> String {
		format!("{}, {} - {}", self.street, self.number, self.neighborhood)
	}
}

/// Role of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
	Client,
	RestaurantOwner,
	/// Any role string this client does not know about.
	Unknown(String),
}

impl UserRole {
	pub fn as_str(&self) -> &str {
		match self {
			UserRole::Client => "CLIENT",
			UserRole::RestaurantOwner => "RESTAURANT_OWNER",
			UserRole::Unknown(raw) => raw,
		}
	}

	/// Localized display name, `None` for unknown roles.
	pub fn label(&self) -> Option<&'static str> {
		match self {
			UserRole::Client => Some("Cliente"),
			UserRole::RestaurantOwner => Some("Parceiro"),
			UserRole::Unknown(_) => None,
		}
	}
}

impl From<String> for UserRole {
	fn from(raw: String) -> Self {
		match raw.as_str() {
			"CLIENT" => UserRole::Client,
			"RESTAURANT_OWNER" => UserRole::RestaurantOwner,
			_ => UserRole::Unknown(raw),
		}
	}
}

impl From<UserRole> for String {
	fn from(role: UserRole) -> Self {
		role.as_str().to_string()
	}
}

impl fmt::Display for UserRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Profile of the signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
	#[serde(deserialize_with = "string_or_number")]
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub email: String,
	pub role: UserRole,
}
