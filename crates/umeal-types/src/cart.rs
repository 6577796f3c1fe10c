//! Cart line items.

use crate::Product;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product and how many units of it the user intends to order.
///
/// `quantity` is at least 1 while the item is in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
	pub product: Product,
	pub quantity: u32,
}

impl CartItem {
	pub fn new(product: Product) -> Self {
		Self {
			product,
			quantity: 1,
		}
	}

	/// Unit price times quantity.
	pub fn subtotal(&self) -> Decimal {
		self.product.price * Decimal::from(self.quantity)
	}
}
