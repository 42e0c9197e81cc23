// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secrets plane for Ratchet.
//!
//! - [`SecretProvider`]: named-secret CRUD, with in-memory and encrypted
//!   file implementations
//! - [`vault`]: the persisted backend selection with its token sealed at rest
//! - [`SecretGuard`]: snapshot of secret values for redaction
//! - [`SecretsService`]: the mutation path that keeps the guard and
//!   subscribed caches coherent

pub mod encryption;
pub mod error;
pub mod file;
pub mod guard;
pub mod keyfile;
pub mod memory;
pub mod provider;
pub mod service;
pub mod vault;

pub use error::{SecretsError, SecretsResult};
pub use file::FileSecretProvider;
pub use guard::SecretGuard;
pub use memory::MemorySecretProvider;
pub use provider::SecretProvider;
pub use ratchet_common_config::SecretString;
pub use service::{SecretChangeListener, SecretsService};
pub use vault::{
	delete_vault_config, load_vault_config, save_vault_config, vault_config_path, VaultBackend,
	VaultConfig,
};
