// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Environment variable helpers for loading secrets.
//!
//! Supports the `VAR` / `VAR_FILE` convention used by Docker and Kubernetes
//! secret mounts.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::secret::SecretString;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret through an arbitrary variable lookup.
///
/// `{var}_FILE` wins over `{var}`. A single trailing newline is stripped from
/// file contents.
pub fn load_secret_with<F>(var: &str, lookup: F) -> Result<Option<SecretString>, SecretEnvError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{var}_FILE");

	if let Some(path_str) = lookup(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content);
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(lookup(var).map(SecretString::new))
}

/// Load a secret from the process environment using `VAR` / `VAR_FILE`.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	load_secret_with(var, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn lookup_from(map: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
		move |k| map.get(k).cloned()
	}

	#[test]
	fn missing_returns_none() {
		let result = load_secret_with("RATCHET_AUTH_TOKEN", lookup_from(HashMap::new())).unwrap();
		assert!(result.is_none());
	}

	#[test]
	fn direct_value_is_used() {
		let mut map = HashMap::new();
		map.insert("RATCHET_AUTH_TOKEN".to_string(), "tok".to_string());
		let result = load_secret_with("RATCHET_AUTH_TOKEN", lookup_from(map)).unwrap();
		assert_eq!(result.unwrap().expose(), "tok");
	}

	#[test]
	fn file_takes_precedence_and_trailing_newline_is_stripped() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();

		let mut map = HashMap::new();
		map.insert("RATCHET_AUTH_TOKEN".to_string(), "direct".to_string());
		map.insert(
			"RATCHET_AUTH_TOKEN_FILE".to_string(),
			file.path().display().to_string(),
		);

		let result = load_secret_with("RATCHET_AUTH_TOKEN", lookup_from(map)).unwrap();
		assert_eq!(result.unwrap().expose(), "from-file");
	}

	#[test]
	fn empty_file_path_is_an_error() {
		let mut map = HashMap::new();
		map.insert("RATCHET_AUTH_TOKEN_FILE".to_string(), String::new());
		let result = load_secret_with("RATCHET_AUTH_TOKEN", lookup_from(map));
		assert!(matches!(result, Err(SecretEnvError::EmptyPath { .. })));
	}
}
