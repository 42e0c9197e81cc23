// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory snapshot of known secret values, used to scrub them from
//! outbound text (logs, transcripts, tool output).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use ratchet_common_config::SecretString;

use crate::error::SecretsResult;
use crate::provider::SecretProvider;

/// Values shorter than this are never redacted; they match too much text.
pub const MIN_REDACT_LEN: usize = 4;

pub struct SecretGuard {
	provider: Arc<dyn SecretProvider>,
	snapshot: RwLock<HashMap<String, SecretString>>,
}

impl SecretGuard {
	pub fn new(provider: Arc<dyn SecretProvider>) -> Self {
		Self {
			provider,
			snapshot: RwLock::new(HashMap::new()),
		}
	}

	/// The store the snapshot is read from.
	pub fn provider(&self) -> Arc<dyn SecretProvider> {
		Arc::clone(&self.provider)
	}

	/// Replace the snapshot with the full contents of the store.
	#[tracing::instrument(skip(self), fields(provider = %self.provider.name()))]
	pub async fn load_all(&self) -> SecretsResult<()> {
		let names = self.provider.list().await?;
		let mut fresh = HashMap::with_capacity(names.len());
		for name in names {
			if let Some(value) = self.provider.get(&name).await? {
				fresh.insert(name, value);
			}
		}

		let count = fresh.len();
		*self.snapshot.write() = fresh;
		tracing::debug!(count, "secret guard reloaded");
		Ok(())
	}

	/// Refresh only `names`. Names that no longer exist are dropped.
	#[tracing::instrument(skip(self, names), fields(count = names.len()))]
	pub async fn load(&self, names: &[&str]) -> SecretsResult<()> {
		let mut fetched = Vec::with_capacity(names.len());
		for name in names {
			fetched.push((name.to_string(), self.provider.get(name).await?));
		}

		let mut snapshot = self.snapshot.write();
		for (name, value) in fetched {
			match value {
				Some(value) => {
					snapshot.insert(name, value);
				}
				None => {
					snapshot.remove(&name);
				}
			}
		}
		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<SecretString> {
		self.snapshot.read().get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.snapshot.read().contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.snapshot.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshot.read().is_empty()
	}

	/// Replace every known secret value in `text` with `[REDACTED:<name>]`.
	/// Longer values are replaced first so a value containing another is
	/// not partially exposed.
	pub fn redact(&self, text: &str) -> String {
		let snapshot = self.snapshot.read();
		let mut entries: Vec<(&String, &SecretString)> = snapshot
			.iter()
			.filter(|(_, value)| value.len() >= MIN_REDACT_LEN)
			.collect();
		entries.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));

		let mut out = text.to_string();
		for (name, value) in entries {
			if out.contains(value.expose()) {
				out = out.replace(value.expose(), &format!("[REDACTED:{name}]"));
			}
		}
		out
	}

	/// Name of the first known secret whose value appears in `text`.
	pub fn contains_known_secret(&self, text: &str) -> Option<String> {
		let snapshot = self.snapshot.read();
		let mut hits: Vec<&String> = snapshot
			.iter()
			.filter(|(_, value)| value.len() >= MIN_REDACT_LEN && text.contains(value.expose()))
			.map(|(name, _)| name)
			.collect();
		hits.sort();
		hits.first().map(|name| name.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemorySecretProvider;

	fn guard_with(secrets: &[(&str, &str)]) -> (Arc<MemorySecretProvider>, SecretGuard) {
		let provider = Arc::new(MemorySecretProvider::with_secrets(
			secrets.iter().map(|(k, v)| (k.to_string(), v.to_string())),
		));
		let guard = SecretGuard::new(provider.clone());
		(provider, guard)
	}

	#[tokio::test]
	async fn load_all_replaces_snapshot() {
		let (provider, guard) = guard_with(&[("A", "alpha-value"), ("B", "beta-value")]);
		guard.load_all().await.unwrap();
		assert_eq!(guard.len(), 2);

		provider.delete("A").await.unwrap();
		guard.load_all().await.unwrap();
		assert!(!guard.contains("A"));
		assert!(guard.contains("B"));
	}

	#[tokio::test]
	async fn load_merges_subset() {
		let (provider, guard) = guard_with(&[("A", "alpha-value")]);
		guard.load_all().await.unwrap();

		provider.set("B", "beta-value".into()).await.unwrap();
		provider.set("A", "alpha-new".into()).await.unwrap();
		guard.load(&["B"]).await.unwrap();

		assert_eq!(guard.get("B").unwrap().expose(), "beta-value");
		assert_eq!(guard.get("A").unwrap().expose(), "alpha-value");
	}

	#[tokio::test]
	async fn load_drops_missing_names() {
		let (provider, guard) = guard_with(&[("A", "alpha-value")]);
		guard.load_all().await.unwrap();
		provider.delete("A").await.unwrap();
		guard.load(&["A"]).await.unwrap();
		assert!(guard.is_empty());
	}

	#[tokio::test]
	async fn redact_prefers_longest_value() {
		let (_, guard) = guard_with(&[("SHORT", "token"), ("LONG", "token-extended"), ("TINY", "abc")]);
		guard.load_all().await.unwrap();

		let out = guard.redact("a token-extended and a token and abc");
		assert_eq!(out, "a [REDACTED:LONG] and a [REDACTED:SHORT] and abc");
	}

	#[tokio::test]
	async fn contains_known_secret_names_match() {
		let (_, guard) = guard_with(&[("API", "sk-123456")]);
		guard.load_all().await.unwrap();
		assert_eq!(guard.contains_known_secret("key=sk-123456").as_deref(), Some("API"));
		assert!(guard.contains_known_secret("nothing here").is_none());
	}
}
