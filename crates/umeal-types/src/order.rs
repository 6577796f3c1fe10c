//! Order projections and the order status chain.
//!
//! Orders are authored by the remote API and only re-displayed here. The status
//! chain is forward-only: `Pending -> Confirmed -> InPreparation ->
//! OutForDelivery -> Delivered`. `Cancelled` is terminal and only reachable by
//! an external actor. Unrecognised wire values are preserved in `Unknown`.

use crate::utils::serde_helpers::string_or_number;
use crate::DeliveryAddress;
use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An order as returned by `GET /restaurants/{id}/orders` or `GET /orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	#[serde(deserialize_with = "string_or_number")]
	pub id: String,
	#[serde(default)]
	pub customer_name: String,
	/// Only present on the customer's own order history.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub restaurant_name: Option<String>,
	#[serde(default)]
	pub items: Vec<OrderItem>,
	#[serde(default)]
	pub total_price: Decimal,
	pub status: OrderStatus,
	#[serde(default)]
	pub created_at: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub delivery_address: Option<DeliveryAddress>,
}

impl Order {
	/// Parses `created_at` as RFC 3339 or as a zone-less ISO timestamp.
	///
	/// Returns `None` when the API sent nothing usable.
	pub fn placed_at(&self) -> Option<NaiveDateTime> {
		DateTime::parse_from_rfc3339(&self.created_at)
			.map(|dt| dt.naive_local())
			.or_else(|_| NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f"))
			.ok()
	}
}

/// A single line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	#[serde(default)]
	pub product_name: String,
	#[serde(default)]
	pub quantity: u32,
	#[serde(default)]
	pub unit_price: Decimal,
}

/// Status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
	Pending,
	Confirmed,
	InPreparation,
	OutForDelivery,
	Delivered,
	Cancelled,
	/// A status value outside the known set, kept verbatim.
	Unknown(String),
}

/// Statuses shown as lanes on the order board, in chain order.
pub const LANE_STATUSES: [OrderStatus; 5] = [
	OrderStatus::Pending,
	OrderStatus::Confirmed,
	OrderStatus::InPreparation,
	OrderStatus::OutForDelivery,
	OrderStatus::Delivered,
];

impl OrderStatus {
	/// Wire representation.
	pub fn as_str(&self) -> &str {
		match self {
			OrderStatus::Pending => "PENDING",
			OrderStatus::Confirmed => "CONFIRMED",
			OrderStatus::InPreparation => "IN_PREPARATION",
			OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
			OrderStatus::Delivered => "DELIVERED",
			OrderStatus::Cancelled => "CANCELLED",
			OrderStatus::Unknown(raw) => raw,
		}
	}

	/// Next status in the chain, or `None` for terminal and unknown statuses.
	pub fn next(&self) -> Option<OrderStatus> {
		match self {
			OrderStatus::Pending => Some(OrderStatus::Confirmed),
			OrderStatus::Confirmed => Some(OrderStatus::InPreparation),
			OrderStatus::InPreparation => Some(OrderStatus::OutForDelivery),
			OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
			OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Unknown(_) => None,
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
	}

	pub fn is_unknown(&self) -> bool {
		matches!(self, OrderStatus::Unknown(_))
	}

	/// Customer-facing label.
	pub fn label(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pendente",
			OrderStatus::Confirmed => "Confirmado",
			OrderStatus::InPreparation => "Em Preparo",
			OrderStatus::OutForDelivery => "Saiu para Entrega",
			OrderStatus::Delivered => "Entregue",
			OrderStatus::Cancelled => "Cancelado",
			OrderStatus::Unknown(_) => "Desconhecido",
		}
	}

	/// Column title on the restaurant's order board.
	pub fn lane_title(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pendente",
			OrderStatus::Confirmed => "Aceito",
			OrderStatus::InPreparation => "Em Preparo",
			OrderStatus::OutForDelivery => "Saiu p/ Entrega",
			OrderStatus::Delivered => "Entregue",
			OrderStatus::Cancelled => "Cancelado",
			OrderStatus::Unknown(_) => "Desconhecido",
		}
	}
}

impl From<String> for OrderStatus {
	fn from(raw: String) -> Self {
		match raw.as_str() {
			"PENDING" => OrderStatus::Pending,
			"CONFIRMED" => OrderStatus::Confirmed,
			"IN_PREPARATION" => OrderStatus::InPreparation,
			"OUT_FOR_DELIVERY" => OrderStatus::OutForDelivery,
			"DELIVERED" => OrderStatus::Delivered,
			"CANCELLED" => OrderStatus::Cancelled,
			_ => OrderStatus::Unknown(raw),
		}
	}
}

impl From<OrderStatus> for String {
	fn from(status: OrderStatus) -> Self {
		status.as_str().to_string()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}
