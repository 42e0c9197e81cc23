// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The machine-local key material at `<data_dir>/.vault-key`.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;
use zeroize::Zeroizing;

use ratchet_common_config::VAULT_KEY_FILE;

use crate::encryption::{derive_key, generate_key, KEY_SIZE};
use crate::error::{SecretsError, SecretsResult};

pub fn key_file_path(data_dir: &Path) -> PathBuf {
	data_dir.join(VAULT_KEY_FILE)
}

/// Create `dir` (and parents) with mode 0700 if it does not exist.
pub async fn ensure_private_dir(dir: &Path) -> SecretsResult<()> {
	if fs::try_exists(dir).await? {
		return Ok(());
	}

	#[cfg(unix)]
	{
		fs::DirBuilder::new()
			.recursive(true)
			.mode(0o700)
			.create(dir)
			.await?;
	}

	#[cfg(not(unix))]
	{
		fs::create_dir_all(dir).await?;
	}

	Ok(())
}

/// Write `content` to `path`, leaving it readable by the owner only.
pub async fn write_private_file(path: &Path, content: &[u8]) -> SecretsResult<()> {
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		use tokio::fs::OpenOptions;
		use tokio::io::AsyncWriteExt;

		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)
			.await?;
		file.write_all(content).await?;
		file.flush().await?;
		fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
	}

	#[cfg(not(unix))]
	{
		fs::write(path, content).await?;
	}

	Ok(())
}

/// Read existing key material. Never creates it.
#[instrument(skip_all, fields(dir = %data_dir.display()))]
pub async fn read_key_material(data_dir: &Path) -> SecretsResult<Zeroizing<[u8; KEY_SIZE]>> {
	let path = key_file_path(data_dir);
	let bytes = Zeroizing::new(fs::read(&path).await.map_err(|e| {
		SecretsError::KeyFile(format!("cannot read {}: {e}", path.display()))
	})?);

	if bytes.len() != KEY_SIZE {
		return Err(SecretsError::KeyFile(format!(
			"{} holds {} bytes, expected {KEY_SIZE}",
			path.display(),
			bytes.len()
		)));
	}

	let mut material = Zeroizing::new([0u8; KEY_SIZE]);
	material.copy_from_slice(&bytes);
	Ok(material)
}

/// Read the key material, generating it on first use.
#[instrument(skip_all, fields(dir = %data_dir.display()))]
pub async fn load_or_create_key_material(data_dir: &Path) -> SecretsResult<Zeroizing<[u8; KEY_SIZE]>> {
	let path = key_file_path(data_dir);
	if fs::try_exists(&path).await? {
		return read_key_material(data_dir).await;
	}

	ensure_private_dir(data_dir).await?;
	let material = generate_key();
	write_private_file(&path, material.as_slice()).await?;
	tracing::info!(path = %path.display(), "generated vault key material");
	Ok(material)
}

/// Canonical form of the data directory used in key derivation.
async fn key_scope(data_dir: &Path) -> PathBuf {
	fs::canonicalize(data_dir)
		.await
		.unwrap_or_else(|_| data_dir.to_path_buf())
}

/// Data key for `data_dir`, generating key material if needed.
pub async fn data_key_for_write(data_dir: &Path) -> SecretsResult<Zeroizing<[u8; KEY_SIZE]>> {
	let material = load_or_create_key_material(data_dir).await?;
	Ok(derive_key(&material, &key_scope(data_dir).await))
}

/// Data key for `data_dir`. Fails if no key material exists.
pub async fn data_key_for_read(data_dir: &Path) -> SecretsResult<Zeroizing<[u8; KEY_SIZE]>> {
	let material = read_key_material(data_dir).await?;
	Ok(derive_key(&material, &key_scope(data_dir).await))
}
