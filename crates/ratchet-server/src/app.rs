// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component wiring. Every component receives the handles it needs at
//! construction; nothing is looked up by name at runtime.

use std::sync::Arc;

use ratchet_common_config::RatchetConfig;
use ratchet_server_db::{
	LlmProviderRepository, SqlitePool, ToolPolicyRepository, WebhookRepository,
};
use ratchet_server_llm_registry::{ClientFactory, DefaultClientFactory, ProviderRegistry};
use ratchet_server_policy::PolicyEngine;
use ratchet_server_secrets::keyfile::ensure_private_dir;
use ratchet_server_secrets::{
	delete_vault_config, load_vault_config, save_vault_config, FileSecretProvider, SecretGuard,
	SecretsResult, SecretsService, VaultBackend, VaultConfig,
};
use ratchet_server_security_audit::{
	AuditContext, SecurityAuditor, SecurityReport, ServiceRegistry, StaticServiceRegistry,
	VAULT_DEV_SERVICE,
};
use tracing::instrument;

use crate::error::CoreResult;
use crate::webhook::WebhookReceiver;

pub struct RatchetCore {
	config: RatchetConfig,
	pool: SqlitePool,
	secrets: Arc<SecretsService>,
	providers: Arc<ProviderRegistry>,
	policy: Arc<PolicyEngine>,
	webhooks: Arc<WebhookReceiver>,
	services: Arc<dyn ServiceRegistry>,
}

impl RatchetCore {
	/// Guard over the file-backed secret store in the configured data dir.
	/// Built before the core so logging can redact from the first line.
	pub fn file_guard(config: &RatchetConfig) -> Arc<SecretGuard> {
		let provider = Arc::new(FileSecretProvider::new(config.data_dir.clone()));
		Arc::new(SecretGuard::new(provider))
	}

	pub async fn open(config: RatchetConfig) -> CoreResult<Self> {
		let guard = Self::file_guard(&config);
		Self::open_with_guard(config, guard).await
	}

	/// Open the database and wire every component around `guard`'s provider.
	#[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
	pub async fn open_with_guard(config: RatchetConfig, guard: Arc<SecretGuard>) -> CoreResult<Self> {
		ensure_private_dir(&config.data_dir).await?;
		if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await?;
		}

		let pool = ratchet_server_db::open(&config.database_url()).await?;

		// The local file store is the development vault backend.
		let services = StaticServiceRegistry::new().with(VAULT_DEV_SERVICE);
		if let Some(warning) = vault_startup_warning(&load_vault_config(&config.data_dir).await) {
			tracing::warn!("{warning}");
		}

		let factory = Arc::new(DefaultClientFactory::new()?);
		Self::assemble(config, pool, guard, Arc::new(services), factory).await
	}

	/// Wire components over explicit parts.
	pub async fn assemble(
		config: RatchetConfig,
		pool: SqlitePool,
		guard: Arc<SecretGuard>,
		services: Arc<dyn ServiceRegistry>,
		factory: Arc<dyn ClientFactory>,
	) -> CoreResult<Self> {
		guard.load_all().await?;
		let secrets = Arc::new(SecretsService::with_guard(guard));

		let providers = Arc::new(ProviderRegistry::new(
			Arc::new(LlmProviderRepository::new(pool.clone())),
			secrets.provider(),
			factory,
		));
		secrets.subscribe(providers.clone());

		let policy = Arc::new(PolicyEngine::new(
			Arc::new(ToolPolicyRepository::new(pool.clone())),
			config.default_tool_policy,
		));
		let webhooks = Arc::new(WebhookReceiver::new(
			Arc::new(WebhookRepository::new(pool.clone())),
			secrets.provider(),
		));

		tracing::info!(
			environment = %config.environment,
			default_tool_policy = %config.default_tool_policy,
			secrets = secrets.guard().len(),
			"ratchet core ready"
		);

		Ok(Self {
			config,
			pool,
			secrets,
			providers,
			policy,
			webhooks,
			services,
		})
	}

	pub fn config(&self) -> &RatchetConfig {
		&self.config
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub fn secrets(&self) -> &Arc<SecretsService> {
		&self.secrets
	}

	pub fn providers(&self) -> &Arc<ProviderRegistry> {
		&self.providers
	}

	pub fn policy(&self) -> &Arc<PolicyEngine> {
		&self.policy
	}

	pub fn webhooks(&self) -> &Arc<WebhookReceiver> {
		&self.webhooks
	}

	pub fn services(&self) -> &Arc<dyn ServiceRegistry> {
		&self.services
	}

	pub async fn vault_config(&self) -> CoreResult<Option<VaultConfig>> {
		Ok(load_vault_config(&self.config.data_dir).await?)
	}

	pub async fn save_vault_config(&self, vault: &VaultConfig) -> CoreResult<()> {
		Ok(save_vault_config(&self.config.data_dir, vault).await?)
	}

	pub async fn delete_vault_config(&self) -> CoreResult<bool> {
		Ok(delete_vault_config(&self.config.data_dir).await?)
	}

	pub fn audit_context(&self) -> AuditContext {
		AuditContext::from_config(&self.config)
			.with_database(self.pool.clone())
			.with_services(self.services.clone())
			.with_secrets(self.secrets.provider())
			.with_guard(self.secrets.guard())
	}

	pub async fn audit(&self) -> SecurityReport {
		SecurityAuditor::new(self.audit_context()).run().await
	}
}

/// Startup warning for the stored vault config, if any.
fn vault_startup_warning(loaded: &SecretsResult<Option<VaultConfig>>) -> Option<String> {
	match loaded {
		Ok(Some(vault)) if vault.backend == VaultBackend::Remote => Some(
			"remote vault backend configured but no remote client is attached; using the local file store"
				.to_string(),
		),
		Ok(_) => None,
		Err(e) => Some(format!("vault config is unreadable: {e}")),
	}
}
