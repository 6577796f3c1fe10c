//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each backend module (storage, API backend) provides a `Registry` struct
/// implementing this trait, so the name used in `[storage.implementations.<name>]`
/// or `[backend.implementations.<name>]` maps to exactly one factory.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
