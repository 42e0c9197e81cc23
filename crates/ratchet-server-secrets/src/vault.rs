// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persisted secrets backend selection (`<data_dir>/vault-config.json`).
//!
//! The token field is encrypted on save and decrypted on load; see
//! [`crate::encryption`]. Loading never generates key material.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ratchet_common_config::{SecretString, VAULT_CONFIG_FILE};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::instrument;

use crate::encryption::{decrypt_token, encrypt_token, is_encrypted};
use crate::error::{SecretsError, SecretsResult};
use crate::keyfile::{data_key_for_read, data_key_for_write, ensure_private_dir, write_private_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VaultBackend {
	#[default]
	#[serde(rename = "dev", alias = "vault-dev")]
	Dev,
	#[serde(rename = "remote", alias = "vault-remote")]
	Remote,
}

impl VaultBackend {
	pub fn as_str(&self) -> &'static str {
		match self {
			VaultBackend::Dev => "dev",
			VaultBackend::Remote => "remote",
		}
	}
}

impl fmt::Display for VaultBackend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for VaultBackend {
	type Err = SecretsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"dev" | "vault-dev" => Ok(VaultBackend::Dev),
			"remote" | "vault-remote" => Ok(VaultBackend::Remote),
			other => Err(SecretsError::InvalidArgument(format!(
				"unknown vault backend '{other}', expected 'dev' or 'remote'"
			))),
		}
	}
}

/// Secrets backend configuration. `Debug` never prints the token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultConfig {
	pub backend: VaultBackend,
	pub address: Option<String>,
	pub token: Option<SecretString>,
	pub mount_path: Option<String>,
	pub namespace: Option<String>,
}

/// On-disk layout. `token` holds the sealed form.
#[derive(Serialize, Deserialize)]
struct StoredVaultConfig {
	backend: VaultBackend,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	mount_path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	namespace: Option<String>,
}

pub fn vault_config_path(data_dir: &Path) -> PathBuf {
	data_dir.join(VAULT_CONFIG_FILE)
}

/// Write `config` under `data_dir`, encrypting a non-empty token.
#[instrument(skip(config), fields(dir = %data_dir.display(), backend = %config.backend))]
pub async fn save_vault_config(data_dir: &Path, config: &VaultConfig) -> SecretsResult<()> {
	ensure_private_dir(data_dir).await?;

	let token = match config.token.as_ref() {
		Some(token) if !token.is_empty() => {
			let key = data_key_for_write(data_dir).await?;
			Some(encrypt_token(&key, token.expose())?)
		}
		Some(_) => Some(String::new()),
		None => None,
	};

	let stored = StoredVaultConfig {
		backend: config.backend,
		address: config.address.clone(),
		token,
		mount_path: config.mount_path.clone(),
		namespace: config.namespace.clone(),
	};
	let json = serde_json::to_vec_pretty(&stored)?;
	write_private_file(&vault_config_path(data_dir), &json).await?;

	tracing::info!("vault config saved");
	Ok(())
}

/// Read the config under `data_dir`. A missing file is `Ok(None)`; an empty
/// stored token loads as `None`.
#[instrument(fields(dir = %data_dir.display()))]
pub async fn load_vault_config(data_dir: &Path) -> SecretsResult<Option<VaultConfig>> {
	let path = vault_config_path(data_dir);
	let bytes = match fs::read(&path).await {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(e.into()),
	};

	let stored: StoredVaultConfig = serde_json::from_slice(&bytes)?;

	let token = match stored.token {
		Some(ref raw) if is_encrypted(raw) => {
			let key = data_key_for_read(data_dir).await?;
			let plain = decrypt_token(&key, raw)?;
			Some(SecretString::new(plain.as_str()))
		}
		Some(raw) if !raw.is_empty() => Some(SecretString::new(raw)),
		_ => None,
	};

	Ok(Some(VaultConfig {
		backend: stored.backend,
		address: stored.address,
		token,
		mount_path: stored.mount_path,
		namespace: stored.namespace,
	}))
}

/// Remove the config file. The key file is kept so other sealed values stay
/// readable. Returns whether a file was removed.
#[instrument(fields(dir = %data_dir.display()))]
pub async fn delete_vault_config(data_dir: &Path) -> SecretsResult<bool> {
	match fs::remove_file(vault_config_path(data_dir)).await {
		Ok(()) => {
			tracing::info!("vault config deleted");
			Ok(true)
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
		Err(e) => Err(e.into()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::keyfile::key_file_path;
	use tempfile::TempDir;

	fn remote(token: &str) -> VaultConfig {
		VaultConfig {
			backend: VaultBackend::Remote,
			address: Some("https://v.example:8200".to_string()),
			token: Some(SecretString::new(token)),
			mount_path: Some("secret".to_string()),
			namespace: None,
		}
	}

	#[tokio::test]
	async fn save_then_load_roundtrips() {
		let dir = TempDir::new().unwrap();
		save_vault_config(dir.path(), &remote("s.mytoken")).await.unwrap();

		let raw = std::fs::read_to_string(vault_config_path(dir.path())).unwrap();
		assert!(!raw.contains("s.mytoken"));
		let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
		assert!(json["token"].as_str().unwrap().starts_with("enc:"));
		assert_eq!(json["mount_path"], "secret");

		let loaded = load_vault_config(dir.path()).await.unwrap().unwrap();
		assert_eq!(loaded, remote("s.mytoken"));
	}

	#[tokio::test]
	async fn missing_file_is_none() {
		let dir = TempDir::new().unwrap();
		assert!(load_vault_config(dir.path()).await.unwrap().is_none());
		assert!(!key_file_path(dir.path()).exists());
	}

	#[tokio::test]
	async fn invalid_json_is_error() {
		let dir = TempDir::new().unwrap();
		std::fs::write(vault_config_path(dir.path()), "{not json").unwrap();
		assert!(matches!(
			load_vault_config(dir.path()).await,
			Err(SecretsError::Serialization(_))
		));
	}

	#[tokio::test]
	async fn undecryptable_token_is_error() {
		let dir = TempDir::new().unwrap();
		save_vault_config(dir.path(), &remote("s.mytoken")).await.unwrap();
		std::fs::write(
			vault_config_path(dir.path()),
			r#"{"backend":"remote","token":"enc:AAAA"}"#,
		)
		.unwrap();
		assert!(matches!(
			load_vault_config(dir.path()).await,
			Err(SecretsError::Decryption(_))
		));
	}

	#[tokio::test]
	async fn moved_config_without_key_cannot_decrypt() {
		let a = TempDir::new().unwrap();
		let b = TempDir::new().unwrap();
		save_vault_config(a.path(), &remote("s.mytoken")).await.unwrap();
		std::fs::copy(vault_config_path(a.path()), vault_config_path(b.path())).unwrap();

		assert!(matches!(
			load_vault_config(b.path()).await,
			Err(SecretsError::KeyFile(_))
		));
	}

	#[tokio::test]
	async fn empty_token_is_written_verbatim() {
		let dir = TempDir::new().unwrap();
		save_vault_config(dir.path(), &remote("")).await.unwrap();

		let raw = std::fs::read_to_string(vault_config_path(dir.path())).unwrap();
		let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
		assert_eq!(json["token"], "");
		assert!(!key_file_path(dir.path()).exists());

		let loaded = load_vault_config(dir.path()).await.unwrap().unwrap();
		assert!(loaded.token.is_none());
	}

	#[tokio::test]
	async fn accepts_prefixed_backend_names() {
		let dir = TempDir::new().unwrap();
		std::fs::write(
			vault_config_path(dir.path()),
			r#"{"backend":"vault-dev"}"#,
		)
		.unwrap();
		let loaded = load_vault_config(dir.path()).await.unwrap().unwrap();
		assert_eq!(loaded.backend, VaultBackend::Dev);
		assert!(loaded.token.is_none());
	}

	#[tokio::test]
	#[cfg(unix)]
	async fn files_are_owner_only() {
		use std::os::unix::fs::PermissionsExt;

		let dir = TempDir::new().unwrap();
		save_vault_config(dir.path(), &remote("t0ken")).await.unwrap();

		for path in [vault_config_path(dir.path()), key_file_path(dir.path())] {
			let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
			assert_eq!(mode, 0o600, "{}", path.display());
		}
	}

	#[tokio::test]
	async fn delete_keeps_key_file() {
		let dir = TempDir::new().unwrap();
		save_vault_config(dir.path(), &remote("t0ken")).await.unwrap();

		assert!(delete_vault_config(dir.path()).await.unwrap());
		assert!(!delete_vault_config(dir.path()).await.unwrap());
		assert!(key_file_path(dir.path()).exists());
		assert!(load_vault_config(dir.path()).await.unwrap().is_none());
	}

	#[test]
	fn debug_redacts_token() {
		let printed = format!("{:?}", remote("s.mytoken"));
		assert!(!printed.contains("s.mytoken"));
	}
}
