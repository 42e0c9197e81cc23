// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration primitives for Ratchet.
//!
//! - [`SecretString`]: a credential wrapper that never prints its value
//! - [`load_secret_env`]: `VAR` / `VAR_FILE` secret loading
//! - [`load_config`]: layered configuration (defaults, TOML file, `RATCHET_*`
//!   environment variables)

pub mod env;
pub mod error;
pub mod secret;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, load_secret_with, SecretEnvError};
pub use error::ConfigError;
pub use secret::{SecretString, REDACTED};
pub use sections::{
	default_data_dir, DefaultPolicy, Environment, LogFormat, LoggingConfig, LoggingConfigLayer,
	RatchetConfigLayer,
};
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Name of the vault configuration document inside the data directory.
pub const VAULT_CONFIG_FILE: &str = "vault-config.json";

/// Name of the machine-local key file inside the data directory.
pub const VAULT_KEY_FILE: &str = ".vault-key";

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct RatchetConfig {
	pub environment: Environment,
	/// `None` when unset or empty; the development default is then in effect.
	pub auth_token: Option<SecretString>,
	pub data_dir: PathBuf,
	pub db_path: PathBuf,
	pub default_tool_policy: DefaultPolicy,
	pub logging: LoggingConfig,
}

impl RatchetConfig {
	/// SQLite connection string for [`RatchetConfig::db_path`].
	pub fn database_url(&self) -> String {
		format!("sqlite:{}", self.db_path.display())
	}

	pub fn vault_config_path(&self) -> PathBuf {
		self.data_dir.join(VAULT_CONFIG_FILE)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`RATCHET_*`)
/// 2. Config file (`$RATCHET_CONFIG` or `/etc/ratchet/ratchet.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<RatchetConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::new()),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<RatchetConfig, ConfigError> {
	load_from_sources(vec![Box::new(DefaultsSource), Box::new(EnvSource::new())])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<RatchetConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::new()),
	])
}

/// Merge an explicit list of sources, lowest precedence first.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<RatchetConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = RatchetConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: RatchetConfigLayer) -> Result<RatchetConfig, ConfigError> {
	let environment = layer
		.environment
		.as_deref()
		.map(Environment::from)
		.unwrap_or_default();

	let auth_token = layer.auth_token.filter(|t| !t.is_empty());
	let data_dir = layer.data_dir.unwrap_or_else(default_data_dir);
	let db_path = layer
		.db_path
		.unwrap_or_else(|| data_dir.join("ratchet.db"));

	let default_tool_policy = match layer.default_tool_policy {
		Some(p) => p.parse()?,
		None => DefaultPolicy::default(),
	};

	let logging = layer.logging.unwrap_or_default().finalize()?;

	info!(
		environment = %environment,
		data_dir = %data_dir.display(),
		db_path = %db_path.display(),
		default_tool_policy = %default_tool_policy,
		auth_token_configured = auth_token.is_some(),
		"configuration loaded"
	);

	Ok(RatchetConfig {
		environment,
		auth_token,
		data_dir,
		db_path,
		default_tool_policy,
		logging,
	})
}
