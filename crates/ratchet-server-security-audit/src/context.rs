// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::sync::Arc;

use ratchet_common_config::{DefaultPolicy, Environment, RatchetConfig, SecretString};
use ratchet_server_db::{
	LlmProviderRepository, LlmProviderStore, McpServerRepository, McpServerStore, SqlitePool,
	ToolPolicyRepository, ToolPolicyStore, TranscriptRepository, TranscriptStore,
	WebhookRepository, WebhookStore,
};
use ratchet_server_secrets::{SecretGuard, SecretProvider};

use crate::services::{ServiceRegistry, StaticServiceRegistry};

/// Everything the checks may inspect. Stores and secrets are optional; a
/// check whose input is absent reports that instead of failing.
#[derive(Clone)]
pub struct AuditContext {
	pub environment: Environment,
	pub auth_token: Option<SecretString>,
	pub data_dir: PathBuf,
	pub db_path: PathBuf,
	pub default_tool_policy: DefaultPolicy,
	pub services: Arc<dyn ServiceRegistry>,
	pub policies: Option<Arc<dyn ToolPolicyStore>>,
	pub transcripts: Option<Arc<dyn TranscriptStore>>,
	pub mcp_servers: Option<Arc<dyn McpServerStore>>,
	pub webhooks: Option<Arc<dyn WebhookStore>>,
	pub providers: Option<Arc<dyn LlmProviderStore>>,
	pub secrets: Option<Arc<dyn SecretProvider>>,
	pub guard: Option<Arc<SecretGuard>>,
}

impl AuditContext {
	pub fn from_config(config: &RatchetConfig) -> Self {
		Self {
			environment: config.environment.clone(),
			auth_token: config.auth_token.clone(),
			data_dir: config.data_dir.clone(),
			db_path: config.db_path.clone(),
			default_tool_policy: config.default_tool_policy,
			services: Arc::new(StaticServiceRegistry::new()),
			policies: None,
			transcripts: None,
			mcp_servers: None,
			webhooks: None,
			providers: None,
			secrets: None,
			guard: None,
		}
	}

	/// Attach repositories for every table over one pool.
	pub fn with_database(mut self, pool: SqlitePool) -> Self {
		self.policies = Some(Arc::new(ToolPolicyRepository::new(pool.clone())));
		self.transcripts = Some(Arc::new(TranscriptRepository::new(pool.clone())));
		self.mcp_servers = Some(Arc::new(McpServerRepository::new(pool.clone())));
		self.webhooks = Some(Arc::new(WebhookRepository::new(pool.clone())));
		self.providers = Some(Arc::new(LlmProviderRepository::new(pool)));
		self
	}

	pub fn with_services(mut self, services: Arc<dyn ServiceRegistry>) -> Self {
		self.services = services;
		self
	}

	pub fn with_policy_store(mut self, store: Arc<dyn ToolPolicyStore>) -> Self {
		self.policies = Some(store);
		self
	}

	pub fn with_transcript_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
		self.transcripts = Some(store);
		self
	}

	pub fn with_secrets(mut self, secrets: Arc<dyn SecretProvider>) -> Self {
		self.secrets = Some(secrets);
		self
	}

	pub fn with_guard(mut self, guard: Arc<SecretGuard>) -> Self {
		self.guard = Some(guard);
		self
	}

	pub fn is_production(&self) -> bool {
		self.environment.is_production()
	}
}
