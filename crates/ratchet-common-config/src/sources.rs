// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment variables.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::env::load_secret_with;
use crate::error::ConfigError;
use crate::sections::{LoggingConfigLayer, RatchetConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<RatchetConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<RatchetConfigLayer, ConfigError> {
		Ok(RatchetConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `$RATCHET_CONFIG` when set, otherwise `/etc/ratchet/ratchet.toml`.
	pub fn system() -> Self {
		match std::env::var("RATCHET_CONFIG") {
			Ok(path) if !path.is_empty() => Self::new(path),
			_ => Self::new("/etc/ratchet/ratchet.toml"),
		}
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<RatchetConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(RatchetConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: RatchetConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Convention: `RATCHET_<FIELD>`.
pub struct EnvSource {
	lookup: Lookup,
}

impl EnvSource {
	pub fn new() -> Self {
		Self {
			lookup: Arc::new(|name| std::env::var(name).ok()),
		}
	}

	/// Build a source that reads variables through `lookup` instead of the
	/// process environment.
	pub fn from_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String> + Send + Sync + 'static,
	{
		Self {
			lookup: Arc::new(lookup),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name)
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<RatchetConfigLayer, ConfigError> {
		debug!("loading environment variables");

		let lookup = Arc::clone(&self.lookup);
		let auth_token = load_secret_with("RATCHET_AUTH_TOKEN", move |name| lookup(name))
			.map_err(|e| ConfigError::Secret(e.to_string()))?;

		let level = self.var("RATCHET_LOG_LEVEL");
		let format = self.var("RATCHET_LOG_FORMAT");
		let logging = if level.is_some() || format.is_some() {
			Some(LoggingConfigLayer { level, format })
		} else {
			None
		};

		Ok(RatchetConfigLayer {
			environment: self.var("RATCHET_ENV"),
			auth_token,
			data_dir: self.var("RATCHET_DATA_DIR").map(PathBuf::from),
			db_path: self.var("RATCHET_DB_PATH").map(PathBuf::from),
			default_tool_policy: self.var("RATCHET_DEFAULT_TOOL_POLICY"),
			logging,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn env_source(vars: &[(&str, &str)]) -> EnvSource {
		let map: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		EnvSource::from_lookup(move |k| map.get(k).cloned())
	}

	#[test]
	fn env_source_reads_ratchet_vars() {
		let layer = env_source(&[
			("RATCHET_ENV", "production"),
			("RATCHET_AUTH_TOKEN", "t0ken"),
			("RATCHET_DB_PATH", "/tmp/ratchet.db"),
			("RATCHET_LOG_FORMAT", "json"),
		])
		.load()
		.unwrap();

		assert_eq!(layer.environment.as_deref(), Some("production"));
		assert_eq!(layer.auth_token.unwrap().expose(), "t0ken");
		assert_eq!(layer.db_path, Some(PathBuf::from("/tmp/ratchet.db")));
		assert_eq!(layer.logging.unwrap().format.as_deref(), Some("json"));
	}

	#[test]
	fn env_source_empty_environment() {
		let layer = env_source(&[]).load().unwrap();
		assert!(layer.environment.is_none());
		assert!(layer.auth_token.is_none());
		assert!(layer.logging.is_none());
	}

	#[test]
	fn missing_toml_file_is_skipped() {
		let layer = TomlSource::new("/nonexistent/ratchet.toml").load().unwrap();
		assert!(layer.environment.is_none());
	}

	#[test]
	fn toml_file_is_parsed() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("ratchet.toml");
		std::fs::write(
			&path,
			"environment = \"staging\"\ndefault_tool_policy = \"allow\"\n[logging]\nlevel = \"debug\"\n",
		)
		.unwrap();

		let layer = TomlSource::new(&path).load().unwrap();
		assert_eq!(layer.environment.as_deref(), Some("staging"));
		assert_eq!(layer.default_tool_policy.as_deref(), Some("allow"));
		assert_eq!(layer.logging.unwrap().level.as_deref(), Some("debug"));
	}

	#[test]
	fn invalid_toml_is_an_error() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("ratchet.toml");
		std::fs::write(&path, "environment = [").unwrap();

		let result = TomlSource::new(&path).load();
		assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
	}
}
