// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections: resolved values plus their mergeable layers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::secret::SecretString;

/// Deployment environment named by `RATCHET_ENV`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
	#[default]
	Development,
	Staging,
	Production,
	Other(String),
}

impl Environment {
	pub fn is_production(&self) -> bool {
		matches!(self, Environment::Production)
	}

	pub fn as_str(&self) -> &str {
		match self {
			Environment::Development => "development",
			Environment::Staging => "staging",
			Environment::Production => "production",
			Environment::Other(s) => s,
		}
	}
}

impl From<&str> for Environment {
	fn from(s: &str) -> Self {
		match s.trim().to_lowercase().as_str() {
			"" | "development" | "dev" => Environment::Development,
			"staging" => Environment::Staging,
			"production" | "prod" => Environment::Production,
			other => Environment::Other(other.to_string()),
		}
	}
}

impl fmt::Display for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Decision applied by the tool policy engine when no policy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultPolicy {
	Allow,
	#[default]
	Deny,
}

impl DefaultPolicy {
	pub fn is_allow(self) -> bool {
		matches!(self, DefaultPolicy::Allow)
	}
}

impl fmt::Display for DefaultPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DefaultPolicy::Allow => write!(f, "allow"),
			DefaultPolicy::Deny => write!(f, "deny"),
		}
	}
}

impl FromStr for DefaultPolicy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"allow" => Ok(DefaultPolicy::Allow),
			"deny" => Ok(DefaultPolicy::Deny),
			_ => Err(ConfigError::InvalidValue {
				key: "default_tool_policy".to_string(),
				message: format!("unknown policy '{s}', expected 'allow' or 'deny'"),
			}),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Text,
	Json,
}

impl FromStr for LogFormat {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"text" | "pretty" => Ok(LogFormat::Text),
			"json" => Ok(LogFormat::Json),
			_ => Err(ConfigError::InvalidValue {
				key: "logging.format".to_string(),
				message: format!("unknown log format '{s}', expected 'text' or 'json'"),
			}),
		}
	}
}

/// Logging configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Text,
		}
	}
}

/// Logging configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfigLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: LoggingConfigLayer) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.format.is_some() {
			self.format = other.format;
		}
	}

	pub fn finalize(self) -> Result<LoggingConfig, ConfigError> {
		let format = match self.format {
			Some(f) => f.parse()?,
			None => LogFormat::default(),
		};
		Ok(LoggingConfig {
			level: self.level.unwrap_or_else(|| "info".to_string()),
			format,
		})
	}
}

/// Top-level configuration layer (partial, for merging).
///
/// Mirrors the TOML file layout:
///
/// ```toml
/// environment = "production"
/// data_dir = "/var/lib/ratchet"
/// db_path = "/var/lib/ratchet/ratchet.db"
/// default_tool_policy = "deny"
///
/// [logging]
/// level = "info"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatchetConfigLayer {
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub auth_token: Option<SecretString>,
	#[serde(default)]
	pub data_dir: Option<PathBuf>,
	#[serde(default)]
	pub db_path: Option<PathBuf>,
	#[serde(default)]
	pub default_tool_policy: Option<String>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl RatchetConfigLayer {
	pub fn merge(&mut self, other: RatchetConfigLayer) {
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.auth_token.is_some() {
			self.auth_token = other.auth_token;
		}
		if other.data_dir.is_some() {
			self.data_dir = other.data_dir;
		}
		if other.db_path.is_some() {
			self.db_path = other.db_path;
		}
		if other.default_tool_policy.is_some() {
			self.default_tool_policy = other.default_tool_policy;
		}
		if let Some(theirs) = other.logging {
			match self.logging.as_mut() {
				Some(mine) => mine.merge(theirs),
				None => self.logging = Some(theirs),
			}
		}
	}
}

/// Platform default data directory.
pub fn default_data_dir() -> PathBuf {
	dirs::data_local_dir()
		.map(|d| d.join("ratchet"))
		.unwrap_or_else(|| PathBuf::from(".ratchet"))
}
