//! Configuration module for the uMeal client.
//!
//! Configuration is read from a TOML file. `${VAR}` and `${VAR:-default}`
//! placeholders are replaced with environment variables before parsing, and
//! the parsed configuration is validated before it is handed out.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use umeal_types::SecretString;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the uMeal client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this client instance, used in logs.
	pub client: ClientConfig,
	/// Remote API endpoint and credentials.
	pub api: ApiConfig,
	/// Storage backend for the persisted cart.
	pub storage: StorageConfig,
	/// Which backend implementation serves API calls.
	pub backend: BackendConfig,
	/// Order board behaviour.
	#[serde(default)]
	pub board: BoardConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	pub id: String,
}

/// Remote API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Base URL every endpoint path is appended to.
	pub base_url: String,
	/// Bearer token; requests go out unauthenticated when absent or empty.
	#[serde(default)]
	pub token: Option<SecretString>,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
}

impl ApiConfig {
	/// The token, if one is configured and non-empty.
	pub fn bearer_token(&self) -> Option<&SecretString> {
		self.token.as_ref().filter(|t| !t.is_empty())
	}
}

fn default_api_timeout() -> u64 {
	30
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the API backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of backend implementation names to their configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

/// Order board configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
	/// Seconds between automatic refreshes.
	#[serde(default = "default_poll_interval")]
	pub poll_interval_seconds: u64,
}

impl Default for BoardConfig {
	fn default() -> Self {
		Self {
			poll_interval_seconds: default_poll_interval(),
		}
	}
}

fn default_poll_interval() -> u64 {
	15
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with `default` for
/// `${VAR_NAME:-default}` when the variable is unset. Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last..full.start()]);
		result.push_str(&value);
		last = full.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.as_ref().display(), e),
			))
		})?;
		content.parse()
	}

	/// Poll interval of the order board.
	pub fn poll_interval(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.board.poll_interval_seconds)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client.id.is_empty() {
			return Err(ConfigError::Validation("Client ID cannot be empty".into()));
		}

		if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
		{
			return Err(ConfigError::Validation(format!(
				"API base_url must be an http(s) URL, got '{}'",
				self.api.base_url
			)));
		}
		if self.api.timeout_seconds == 0 || self.api.timeout_seconds > 300 {
			return Err(ConfigError::Validation(
				"API timeout_seconds must be between 1 and 300".into(),
			));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if self.backend.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Backend primary implementation cannot be empty".into(),
			));
		}
		if !self.backend.implementations.is_empty()
			&& !self
				.backend
				.implementations
				.contains_key(&self.backend.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary backend '{}' not found in implementations",
				self.backend.primary
			)));
		}

		if self.board.poll_interval_seconds == 0 || self.board.poll_interval_seconds > 3600 {
			return Err(ConfigError::Validation(
				"Board poll_interval_seconds must be between 1 and 3600".into(),
			));
		}

		Ok(())
	}
}

/// Parses and validates a configuration from TOML text.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[client]
id = "umeal-test"

[api]
base_url = "http://localhost:8080"

[storage]
primary = "memory"
[storage.implementations.memory]

[backend]
primary = "http"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("UMEAL_TEST_HOST", "localhost");
		std::env::set_var("UMEAL_TEST_PORT", "8080");

		let input = "url = \"http://${UMEAL_TEST_HOST}:${UMEAL_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:8080\"");

		std::env::remove_var("UMEAL_TEST_HOST");
		std::env::remove_var("UMEAL_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "token = \"${UMEAL_MISSING_TOKEN:-}\"\nurl = \"${UMEAL_MISSING_URL:-http://x}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "token = \"\"\nurl = \"http://x\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${UMEAL_SURELY_MISSING}\"");
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("UMEAL_SURELY_MISSING"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(config.client.id, "umeal-test");
		assert_eq!(config.api.timeout_seconds, 30);
		assert_eq!(config.board.poll_interval_seconds, 15);
		assert!(config.api.bearer_token().is_none());
	}

	#[test]
	fn test_empty_token_is_treated_as_absent() {
		let config_str = BASE_CONFIG.replace(
			"base_url = \"http://localhost:8080\"",
			"base_url = \"http://localhost:8080\"\ntoken = \"\"",
		);
		let config: Config = config_str.parse().unwrap();
		assert!(config.api.token.is_some());
		assert!(config.api.bearer_token().is_none());
	}

	#[test]
	fn test_invalid_base_url_rejected() {
		let config_str = BASE_CONFIG.replace("http://localhost:8080", "localhost:8080");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("base_url"));
	}

	#[test]
	fn test_unknown_primary_storage_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"memory\"", "primary = \"file\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'file' not found in implementations"));
	}

	#[test]
	fn test_zero_poll_interval_rejected() {
		let config_str = format!("{}\n[board]\npoll_interval_seconds = 0\n", BASE_CONFIG);
		assert!(Config::from_str(&config_str).is_err());
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("umeal.toml");
		std::fs::write(&path, BASE_CONFIG).unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.backend.primary, "http");

		let missing = Config::from_file(dir.path().join("nope.toml")).await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}

	#[test]
	fn test_bundled_config_parses() {
		let config = Config::from_str(include_str!("../../../config/umeal.toml")).unwrap();
		assert_eq!(config.storage.primary, "file");
		assert!(config.backend.implementations.contains_key("http"));
		assert_eq!(config.poll_interval(), std::time::Duration::from_secs(15));
	}
}
