//! Registry of every storage and backend implementation the binary ships.
//!
//! Implementations register themselves through their crate's
//! `get_all_implementations()`, so the configuration can refer to them by name.

use std::collections::HashMap;
use std::sync::OnceLock;
use umeal_api::BackendFactory;
use umeal_config::Config;
use umeal_core::{Client, ClientBuilder, ClientFactories};
use umeal_storage::StorageFactory;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub backend: HashMap<String, BackendFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			backend: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_backend(&mut self, name: impl Into<String>, factory: BackendFactory) {
		self.backend.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in umeal_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in umeal_api::get_all_implementations() {
			tracing::debug!("Registering backend implementation: {}", name);
			registry.register_backend(name, factory);
		}

		registry
	})
}

fn unknown_implementation<T>(kind: &str, name: &str, known: &HashMap<String, T>) -> String {
	let mut available: Vec<_> = known.keys().cloned().collect();
	available.sort();
	format!(
		"Unknown {} implementation '{}'. Available: [{}]",
		kind,
		name,
		available.join(", ")
	)
}

/// Selects the factories the configuration refers to.
pub fn factories_for(
	registry: &FactoryRegistry,
	config: &Config,
) -> Result<ClientFactories<StorageFactory, BackendFactory>, String> {
	let mut storage_factories = HashMap::new();
	for name in config.storage.implementations.keys() {
		let factory = registry
			.storage
			.get(name)
			.ok_or_else(|| unknown_implementation("storage", name, &registry.storage))?;
		storage_factories.insert(name.clone(), *factory);
	}

	let mut backend_factories = HashMap::new();
	let backend_names = config
		.backend
		.implementations
		.keys()
		.chain(std::iter::once(&config.backend.primary));
	for name in backend_names {
		let factory = registry
			.backend
			.get(name)
			.ok_or_else(|| unknown_implementation("backend", name, &registry.backend))?;
		backend_factories.insert(name.clone(), *factory);
	}

	Ok(ClientFactories {
		storage_factories,
		backend_factories,
	})
}

/// Builds a client using the registry and config.
pub async fn build_client_from_config(
	config: Config,
) -> Result<Client, Box<dyn std::error::Error>> {
	let factories = factories_for(get_registry(), &config)?;
	Ok(ClientBuilder::new(config).build(factories).await?)
}
