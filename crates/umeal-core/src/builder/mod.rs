//! Builder for constructing a [`Client`] from configuration.
//!
//! Storage and API backends are pluggable. The builder receives a factory per
//! implementation name and instantiates the ones the configuration selects.

use crate::cart::{CartError, CartStore};
use crate::event_bus::EventBus;
use crate::Client;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use umeal_api::{ApiError, BackendInterface, BackendService};
use umeal_config::{ApiConfig, Config};
use umeal_storage::{StorageError, StorageInterface, StorageService};

/// Errors that can occur during client construction.
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
	#[error("Failed to load cart: {0}")]
	Cart(#[from] CartError),
}

/// Factory functions for every pluggable component, keyed by implementation name.
pub struct ClientFactories<SF, BF> {
	pub storage_factories: HashMap<String, SF>,
	pub backend_factories: HashMap<String, BF>,
}

/// Builder for constructing a Client with pluggable implementations.
pub struct ClientBuilder {
	config: Config,
	event_capacity: usize,
}

impl ClientBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			event_capacity: 256,
		}
	}

	/// Sets how many events a slow subscriber may fall behind before it
	/// starts missing them.
	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity.max(1);
		self
	}

	pub async fn build<SF, BF>(self, factories: ClientFactories<SF, BF>) -> Result<Client, ClientError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		BF: Fn(&toml::Value, &ApiConfig) -> Result<Box<dyn BackendInterface>, ApiError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			if let Some(factory) = factories.storage_factories.get(name) {
				match factory(config) {
					Ok(implementation) => {
						let is_primary = &self.config.storage.primary == name;
						tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
						storage_impls.insert(name.clone(), implementation);
					},
					Err(e) => {
						tracing::error!(
							component = "storage",
							implementation = %name,
							error = %e,
							"Failed to create storage implementation"
						);
						return Err(ClientError::Config(format!(
							"Failed to create storage implementation '{}': {}",
							name, e
						)));
					},
				}
			}
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			ClientError::MissingComponent(format!(
				"No storage implementation registered as '{}'",
				primary_storage
			))
		})?;
		let storage = Arc::new(StorageService::new(storage_backend));

		match storage.cleanup_expired().await {
			Ok(count) if count > 0 => {
				tracing::debug!("Storage cleanup: removed {} expired entries", count);
			},
			Err(e) => {
				tracing::warn!("Storage cleanup failed: {}", e);
			},
			_ => {},
		}

		let primary_backend = &self.config.backend.primary;
		let factory = factories
			.backend_factories
			.get(primary_backend)
			.ok_or_else(|| {
				ClientError::MissingComponent(format!(
					"No backend implementation registered as '{}'",
					primary_backend
				))
			})?;
		let backend_config = self
			.config
			.backend
			.implementations
			.get(primary_backend)
			.cloned()
			.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()));
		let backend = factory(&backend_config, &self.config.api).map_err(|e| {
			tracing::error!(
				component = "backend",
				implementation = %primary_backend,
				error = %e,
				"Failed to create backend implementation"
			);
			ClientError::Config(format!(
				"Failed to create backend implementation '{}': {}",
				primary_backend, e
			))
		})?;
		tracing::info!(component = "backend", implementation = %primary_backend, "Loaded");

		let events = EventBus::new(self.event_capacity);
		let cart = CartStore::load(storage, events.clone()).await?;

		Ok(Client::new(
			self.config,
			cart,
			Arc::new(BackendService::new(backend)),
			events,
		))
	}
}
