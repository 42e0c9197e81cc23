// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Alias-keyed cache of constructed provider clients.
//!
//! A cached client is only valid for the secret value it was built with.
//! Invalidations bump a generation counter; a construction that started
//! before an invalidation is discarded and rebuilt instead of being cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use ratchet_server_db::{LlmProviderRecord, LlmProviderStore, LlmProviderUpdate, NewLlmProvider};
use ratchet_server_secrets::{SecretChangeListener, SecretProvider};

use crate::client::ProviderClient;
use crate::error::{LlmRegistryError, LlmRegistryResult};
use crate::factory::ClientFactory;
use crate::types::{ConnectionTestResult, ProviderSpec, ProviderType};

const MAX_BUILD_ATTEMPTS: usize = 3;

struct CacheEntry {
	client: Arc<dyn ProviderClient>,
	secret_name: String,
}

#[derive(Default)]
struct CacheState {
	entries: HashMap<String, CacheEntry>,
	generation: u64,
}

pub struct ProviderRegistry {
	store: Arc<dyn LlmProviderStore>,
	secrets: Arc<dyn SecretProvider>,
	factory: Arc<dyn ClientFactory>,
	cache: RwLock<CacheState>,
}

impl ProviderRegistry {
	pub fn new(
		store: Arc<dyn LlmProviderStore>,
		secrets: Arc<dyn SecretProvider>,
		factory: Arc<dyn ClientFactory>,
	) -> Self {
		Self {
			store,
			secrets,
			factory,
			cache: RwLock::new(CacheState::default()),
		}
	}

	/// Client for `alias`, building and caching it on a miss.
	#[tracing::instrument(skip(self))]
	pub async fn get_by_alias(&self, alias: &str) -> LlmRegistryResult<Arc<dyn ProviderClient>> {
		if let Some(client) = self.cached(alias) {
			return Ok(client);
		}

		for attempt in 1..=MAX_BUILD_ATTEMPTS {
			let generation = self.cache.read().generation;
			let record = self
				.store
				.get_provider_by_alias(alias)
				.await?
				.ok_or_else(|| LlmRegistryError::NotFound(alias.to_string()))?;

			let client = self.construct(&record).await?;
			match self.insert_if_current(&record, client, generation) {
				Ok(client) => return Ok(client),
				Err(client) if attempt == MAX_BUILD_ATTEMPTS => {
					tracing::warn!(%alias, "cache kept changing during construction; returning uncached client");
					return Ok(client);
				}
				Err(_) => {
					tracing::debug!(%alias, attempt, "invalidated during construction; rebuilding");
				}
			}
		}

		Err(LlmRegistryError::NotFound(alias.to_string()))
	}

	/// Client for the provider marked as default.
	#[tracing::instrument(skip(self))]
	pub async fn get_default(&self) -> LlmRegistryResult<Arc<dyn ProviderClient>> {
		let record = self
			.store
			.get_default_provider()
			.await?
			.ok_or(LlmRegistryError::NoDefault)?;
		self.get_by_alias(&record.alias).await
	}

	/// Load `alias` and probe it. Load failures are returned as errors; a
	/// failed probe is reported in the result. Latency covers both.
	#[tracing::instrument(skip(self))]
	pub async fn test_connection(&self, alias: &str) -> LlmRegistryResult<ConnectionTestResult> {
		let started = Instant::now();
		let client = self.get_by_alias(alias).await?;
		let outcome = client.probe().await;
		let latency = started.elapsed();

		let result = match outcome {
			Ok(message) => ConnectionTestResult {
				ok: true,
				message,
				latency,
			},
			Err(e) => ConnectionTestResult {
				ok: false,
				message: e.to_string(),
				latency,
			},
		};
		tracing::info!(%alias, ok = result.ok, latency_ms = latency.as_millis() as u64, "connection test finished");
		Ok(result)
	}

	/// Drop the cached client for `alias`. Idempotent.
	pub fn invalidate_alias(&self, alias: &str) -> bool {
		let mut cache = self.cache.write();
		cache.generation += 1;
		let removed = cache.entries.remove(alias).is_some();
		if removed {
			tracing::debug!(%alias, "provider cache entry invalidated");
		}
		removed
	}

	/// Drop every cached client built with `secret_name`. Returns how many
	/// entries were removed. Idempotent.
	pub fn invalidate_by_secret(&self, secret_name: &str) -> usize {
		let mut cache = self.cache.write();
		cache.generation += 1;
		let before = cache.entries.len();
		cache.entries.retain(|_, entry| entry.secret_name != secret_name);
		let removed = before - cache.entries.len();
		if removed > 0 {
			tracing::debug!(%secret_name, removed, "provider cache entries invalidated by secret");
		}
		removed
	}

	/// Aliases currently held in the cache.
	pub fn cached_aliases(&self) -> Vec<String> {
		let mut aliases: Vec<String> = self.cache.read().entries.keys().cloned().collect();
		aliases.sort();
		aliases
	}

	pub async fn list_providers(&self) -> LlmRegistryResult<Vec<LlmProviderRecord>> {
		Ok(self.store.list_providers().await?)
	}

	#[tracing::instrument(skip(self, provider), fields(alias = %provider.alias))]
	pub async fn add_provider(&self, provider: NewLlmProvider) -> LlmRegistryResult<LlmProviderRecord> {
		if provider.alias.trim().is_empty() {
			return Err(LlmRegistryError::InvalidArgument("alias is required".to_string()));
		}
		provider.provider_type.parse::<ProviderType>()?;

		let record = self.store.create_provider(&provider).await?;
		self.invalidate_alias(&record.alias);
		Ok(record)
	}

	#[tracing::instrument(skip(self, update))]
	pub async fn update_provider(
		&self,
		alias: &str,
		update: LlmProviderUpdate,
	) -> LlmRegistryResult<LlmProviderRecord> {
		if let Some(provider_type) = update.provider_type.as_deref() {
			provider_type.parse::<ProviderType>()?;
		}

		let record = self.store.update_provider(alias, &update).await.map_err(|e| match e {
			ratchet_server_db::DbError::NotFound(_) => LlmRegistryError::NotFound(alias.to_string()),
			other => other.into(),
		})?;
		self.invalidate_alias(alias);
		Ok(record)
	}

	#[tracing::instrument(skip(self))]
	pub async fn remove_provider(&self, alias: &str) -> LlmRegistryResult<()> {
		let removed = self.store.delete_provider(alias).await?;
		self.invalidate_alias(alias);
		if !removed {
			return Err(LlmRegistryError::NotFound(alias.to_string()));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn set_default(&self, alias: &str) -> LlmRegistryResult<()> {
		self.store.set_default_provider(alias).await.map_err(|e| match e {
			ratchet_server_db::DbError::NotFound(_) => LlmRegistryError::NotFound(alias.to_string()),
			other => other.into(),
		})?;
		self.invalidate_alias(alias);
		Ok(())
	}

	fn cached(&self, alias: &str) -> Option<Arc<dyn ProviderClient>> {
		self
			.cache
			.read()
			.entries
			.get(alias)
			.map(|entry| Arc::clone(&entry.client))
	}

	/// Insert under the write lock, unless an invalidation happened since
	/// `generation` was read. A concurrent insert for the same alias wins.
	fn insert_if_current(
		&self,
		record: &LlmProviderRecord,
		client: Arc<dyn ProviderClient>,
		generation: u64,
	) -> Result<Arc<dyn ProviderClient>, Arc<dyn ProviderClient>> {
		let mut cache = self.cache.write();
		if let Some(existing) = cache.entries.get(&record.alias) {
			return Ok(Arc::clone(&existing.client));
		}
		if cache.generation != generation {
			return Err(client);
		}
		cache.entries.insert(
			record.alias.clone(),
			CacheEntry {
				client: Arc::clone(&client),
				secret_name: record.secret_name.clone(),
			},
		);
		tracing::debug!(alias = %record.alias, "provider client cached");
		Ok(client)
	}

	async fn construct(&self, record: &LlmProviderRecord) -> LlmRegistryResult<Arc<dyn ProviderClient>> {
		let provider_type: ProviderType = record.provider_type.parse()?;

		let api_key = if record.secret_name.is_empty() {
			None
		} else {
			self
				.secrets
				.get(&record.secret_name)
				.await?
				.filter(|value| !value.is_empty())
		};

		if api_key.is_none() && !provider_type.accepts_missing_credentials() {
			return Err(LlmRegistryError::MissingCredentials {
				alias: record.alias.clone(),
				secret_name: record.secret_name.clone(),
			});
		}

		self.factory.build(ProviderSpec {
			alias: record.alias.clone(),
			provider_type,
			model: record.model.clone(),
			base_url: record.base_url.clone(),
			max_tokens: record.max_tokens,
			api_key,
		})
	}
}

impl SecretChangeListener for ProviderRegistry {
	fn secret_changed(&self, name: &str) {
		self.invalidate_by_secret(name);
	}
}
