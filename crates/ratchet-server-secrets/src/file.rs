// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encrypted file-backed secret store at `<data_dir>/secrets.json`.
//!
//! Values are sealed with the same key scheme as the vault token. The file
//! is rewritten whole on every mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ratchet_common_config::SecretString;
use tokio::fs;
use tokio::sync::Mutex;

use crate::encryption::{decrypt_token, encrypt_token};
use crate::error::{SecretsError, SecretsResult};
use crate::keyfile::{data_key_for_read, data_key_for_write, ensure_private_dir, write_private_file};
use crate::provider::SecretProvider;

pub const SECRETS_FILE: &str = "secrets.json";

pub struct FileSecretProvider {
	data_dir: PathBuf,
	write_lock: Mutex<()>,
}

impl FileSecretProvider {
	pub fn new(data_dir: impl Into<PathBuf>) -> Self {
		Self {
			data_dir: data_dir.into(),
			write_lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> PathBuf {
		self.data_dir.join(SECRETS_FILE)
	}

	pub fn data_dir(&self) -> &Path {
		&self.data_dir
	}

	async fn read_sealed(&self) -> SecretsResult<BTreeMap<String, String>> {
		match fs::read(self.path()).await {
			Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
			Err(e) => Err(e.into()),
		}
	}

	async fn write_sealed(&self, sealed: &BTreeMap<String, String>) -> SecretsResult<()> {
		ensure_private_dir(&self.data_dir).await?;
		let json = serde_json::to_vec_pretty(sealed)?;
		write_private_file(&self.path(), &json).await
	}
}

#[async_trait]
impl SecretProvider for FileSecretProvider {
	fn name(&self) -> &str {
		"file"
	}

	#[tracing::instrument(skip(self))]
	async fn get(&self, name: &str) -> SecretsResult<Option<SecretString>> {
		let sealed = self.read_sealed().await?;
		let Some(stored) = sealed.get(name) else {
			return Ok(None);
		};
		let key = data_key_for_read(&self.data_dir).await?;
		let plain = decrypt_token(&key, stored)?;
		Ok(Some(SecretString::new(plain.as_str())))
	}

	#[tracing::instrument(skip(self, value))]
	async fn set(&self, name: &str, value: SecretString) -> SecretsResult<()> {
		if name.is_empty() {
			return Err(SecretsError::InvalidArgument("secret name is empty".to_string()));
		}
		let _guard = self.write_lock.lock().await;
		let mut sealed = self.read_sealed().await?;
		ensure_private_dir(&self.data_dir).await?;
		let key = data_key_for_write(&self.data_dir).await?;
		sealed.insert(name.to_string(), encrypt_token(&key, value.expose())?);
		self.write_sealed(&sealed).await
	}

	#[tracing::instrument(skip(self))]
	async fn delete(&self, name: &str) -> SecretsResult<()> {
		let _guard = self.write_lock.lock().await;
		let mut sealed = self.read_sealed().await?;
		if sealed.remove(name).is_none() {
			return Err(SecretsError::NotFound(name.to_string()));
		}
		self.write_sealed(&sealed).await
	}

	async fn list(&self) -> SecretsResult<Vec<String>> {
		Ok(self.read_sealed().await?.into_keys().collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn values_are_sealed_on_disk() {
		let dir = TempDir::new().unwrap();
		let provider = FileSecretProvider::new(dir.path());

		provider.set("OPENAI_API_KEY", "sk-live-value".into()).await.unwrap();
		let raw = std::fs::read_to_string(provider.path()).unwrap();
		assert!(!raw.contains("sk-live-value"));
		assert!(raw.contains("enc:"));

		let reopened = FileSecretProvider::new(dir.path());
		assert_eq!(
			reopened.get("OPENAI_API_KEY").await.unwrap().unwrap().expose(),
			"sk-live-value"
		);
	}

	#[tokio::test]
	async fn list_and_delete() {
		let dir = TempDir::new().unwrap();
		let provider = FileSecretProvider::new(dir.path());
		assert!(provider.list().await.unwrap().is_empty());

		provider.set("B", "2".into()).await.unwrap();
		provider.set("A", "1".into()).await.unwrap();
		assert_eq!(provider.list().await.unwrap(), vec!["A", "B"]);

		provider.delete("A").await.unwrap();
		assert!(matches!(
			provider.delete("A").await,
			Err(SecretsError::NotFound(_))
		));
		assert!(provider.get("A").await.unwrap().is_none());
	}

	#[tokio::test]
	#[cfg(unix)]
	async fn secrets_file_is_owner_only() {
		use std::os::unix::fs::PermissionsExt;

		let dir = TempDir::new().unwrap();
		let provider = FileSecretProvider::new(dir.path());
		provider.set("A", "value".into()).await.unwrap();

		let mode = std::fs::metadata(provider.path()).unwrap().permissions().mode() & 0o777;
		assert_eq!(mode, 0o600);
	}
}
