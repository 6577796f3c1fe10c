//! Storage namespaces for persisted client state.

use std::str::FromStr;

/// Storage namespaces for different data collections.
///
/// Keys are built as `namespace:id`; backends may apply per-namespace policies
/// such as expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Namespace for the persisted cart.
	Cart,
}

impl StorageKey {
	/// Returns the string representation of the namespace.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Cart => "cart",
		}
	}

	/// Returns an iterator over all namespaces.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Cart].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"cart" => Ok(Self::Cart),
			_ => Err(()),
		}
	}
}

/// Id under [`StorageKey::Cart`] holding the serialized line items.
pub const CART_ITEMS_ID: &str = "items";

/// Id under [`StorageKey::Cart`] holding the bound restaurant id.
pub const CART_RESTAURANT_ID: &str = "restaurant_id";
