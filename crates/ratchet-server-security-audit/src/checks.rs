// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The fixed battery of audit checks.
//!
//! A check never fails. Missing inputs produce an info finding, store
//! errors a low finding naming the check.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use ratchet_server_llm_registry::ProviderType;
use ratchet_server_secrets::{load_vault_config, vault_config_path, VaultBackend};
use serde::Serialize;

use crate::context::AuditContext;
use crate::finding::{AuditFinding, AuditSeverity};
use crate::patterns::{detect, SecretPattern};
use crate::services::{RATE_LIMIT_SERVICE, VAULT_DEV_SERVICE};

/// Auth tokens shorter than this are reported as weak.
pub const MIN_AUTH_TOKEN_LEN: usize = 32;

/// Most recent unredacted transcript rows scanned per audit.
pub const TRANSCRIPT_SCAN_LIMIT: i64 = 500;

const SHELLS: &[&str] = &[
	"sh", "bash", "zsh", "dash", "ksh", "fish", "csh", "tcsh", "cmd", "powershell", "pwsh",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCheck {
	DefaultAuthToken,
	DevVaultBackend,
	VaultFilePermissions,
	ToolPoliciesPresent,
	WildcardAllowPolicy,
	DefaultToolPolicy,
	TranscriptSecretExposure,
	McpShellExecution,
	RateLimiting,
	DatabaseFile,
	WebhookSigning,
	ProviderCredentials,
}

impl AuditCheck {
	pub const ALL: [AuditCheck; 12] = [
		AuditCheck::DefaultAuthToken,
		AuditCheck::DevVaultBackend,
		AuditCheck::VaultFilePermissions,
		AuditCheck::ToolPoliciesPresent,
		AuditCheck::WildcardAllowPolicy,
		AuditCheck::DefaultToolPolicy,
		AuditCheck::TranscriptSecretExposure,
		AuditCheck::McpShellExecution,
		AuditCheck::RateLimiting,
		AuditCheck::DatabaseFile,
		AuditCheck::WebhookSigning,
		AuditCheck::ProviderCredentials,
	];

	pub fn name(&self) -> &'static str {
		match self {
			AuditCheck::DefaultAuthToken => "default_auth_token",
			AuditCheck::DevVaultBackend => "dev_vault_backend",
			AuditCheck::VaultFilePermissions => "vault_file_permissions",
			AuditCheck::ToolPoliciesPresent => "tool_policies_present",
			AuditCheck::WildcardAllowPolicy => "wildcard_allow_policy",
			AuditCheck::DefaultToolPolicy => "default_tool_policy",
			AuditCheck::TranscriptSecretExposure => "transcript_secret_exposure",
			AuditCheck::McpShellExecution => "mcp_shell_execution",
			AuditCheck::RateLimiting => "rate_limiting",
			AuditCheck::DatabaseFile => "database_file",
			AuditCheck::WebhookSigning => "webhook_signing",
			AuditCheck::ProviderCredentials => "provider_credentials",
		}
	}

	pub async fn run(&self, ctx: &AuditContext) -> Vec<AuditFinding> {
		match self {
			AuditCheck::DefaultAuthToken => default_auth_token(*self, ctx),
			AuditCheck::DevVaultBackend => dev_vault_backend(*self, ctx).await,
			AuditCheck::VaultFilePermissions => vault_file_permissions(*self, ctx).await,
			AuditCheck::ToolPoliciesPresent => tool_policies_present(*self, ctx).await,
			AuditCheck::WildcardAllowPolicy => wildcard_allow_policy(*self, ctx).await,
			AuditCheck::DefaultToolPolicy => default_tool_policy(*self, ctx),
			AuditCheck::TranscriptSecretExposure => transcript_secret_exposure(*self, ctx).await,
			AuditCheck::McpShellExecution => mcp_shell_execution(*self, ctx).await,
			AuditCheck::RateLimiting => rate_limiting(*self, ctx),
			AuditCheck::DatabaseFile => database_file(*self, ctx).await,
			AuditCheck::WebhookSigning => webhook_signing(*self, ctx).await,
			AuditCheck::ProviderCredentials => provider_credentials(*self, ctx).await,
		}
	}

	fn finding(
		&self,
		severity: AuditSeverity,
		title: impl Into<String>,
		description: impl Into<String>,
		recommendation: impl Into<String>,
	) -> AuditFinding {
		AuditFinding::new(self.name(), severity, title, description, recommendation)
	}

	fn input_missing(&self, what: &str) -> AuditFinding {
		self.finding(
			AuditSeverity::Info,
			format!("Check skipped: no {what} available"),
			format!("The {} check could not inspect the {what}.", self.name()),
			"Run the audit with the database attached.",
		)
	}

	fn input_failed(&self, what: &str, error: &dyn fmt::Display) -> AuditFinding {
		tracing::warn!(check = self.name(), error = %error, "audit check could not read {what}");
		self.finding(
			AuditSeverity::Low,
			format!("Check incomplete: {what} unavailable"),
			format!("The {} check failed to read the {what}: {error}", self.name()),
			"Verify the database is reachable and re-run the audit.",
		)
	}
}

impl fmt::Display for AuditCheck {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

fn default_auth_token(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	match ctx.auth_token.as_ref().filter(|t| !t.is_empty()) {
		None => vec![check.finding(
			AuditSeverity::Critical,
			"Default auth token in use",
			"RATCHET_AUTH_TOKEN is not set, so the built-in development token protects the API.",
			"Set RATCHET_AUTH_TOKEN (or RATCHET_AUTH_TOKEN_FILE) to a long random value.",
		)],
		Some(token) if token.len() < MIN_AUTH_TOKEN_LEN => vec![check.finding(
			AuditSeverity::Medium,
			"Auth token is short",
			format!(
				"The configured auth token has {} characters; at least {MIN_AUTH_TOKEN_LEN} are expected.",
				token.len()
			),
			"Generate a token with at least 32 random characters.",
		)],
		Some(_) => Vec::new(),
	}
}

async fn dev_vault_backend(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let mut findings = Vec::new();
	let registered = ctx.services.is_registered(VAULT_DEV_SERVICE);
	let configured = match load_vault_config(&ctx.data_dir).await {
		Ok(config) => config.is_some_and(|c| c.backend == VaultBackend::Dev),
		Err(e) => {
			findings.push(check.input_failed("vault configuration", &e));
			false
		}
	};

	if registered || configured {
		if ctx.is_production() {
			findings.push(check.finding(
				AuditSeverity::Critical,
				"Development vault backend in production",
				"Secrets are served by the development vault backend while RATCHET_ENV is production.",
				"Configure the remote vault backend before deploying.",
			));
		} else {
			findings.push(check.finding(
				AuditSeverity::Info,
				"Development vault backend active",
				format!("The development vault backend is active in the {} environment.", ctx.environment),
				"Switch to the remote vault backend before going to production.",
			));
		}
	}
	findings
}

#[cfg(unix)]
async fn file_mode(path: &Path) -> Option<u32> {
	use std::os::unix::fs::PermissionsExt;

	tokio::fs::metadata(path).await.ok().map(|m| m.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
async fn file_mode(_path: &Path) -> Option<u32> {
	None
}

async fn vault_file_permissions(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let mut findings = Vec::new();

	if let Some(mode) = file_mode(&ctx.data_dir).await {
		if mode & 0o077 != 0 {
			findings.push(check.finding(
				AuditSeverity::Medium,
				"Data directory is accessible to other users",
				format!("{} has mode {mode:o}.", ctx.data_dir.display()),
				"chmod 700 the data directory.",
			));
		}
	}

	let files = [
		(vault_config_path(&ctx.data_dir), "Vault configuration"),
		(ctx.data_dir.join(ratchet_common_config::VAULT_KEY_FILE), "Vault key file"),
	];
	for (path, label) in files {
		let Some(mode) = file_mode(&path).await else {
			continue;
		};
		if mode & 0o077 != 0 {
			findings.push(check.finding(
				AuditSeverity::High,
				format!("{label} is readable by other users"),
				format!("{} has mode {mode:o}; expected 600.", path.display()),
				format!("chmod 600 {}", path.display()),
			));
		}
	}
	findings
}

async fn tool_policies_present(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let Some(store) = &ctx.policies else {
		return vec![check.input_missing("policy store")];
	};
	match store.count_policies().await {
		Ok(0) => vec![check.finding(
			AuditSeverity::Medium,
			"No tool policies configured",
			format!(
				"Every tool call falls through to the default policy ({}).",
				ctx.default_tool_policy
			),
			"Add explicit allow and deny policies for the tools agents use.",
		)],
		Ok(_) => Vec::new(),
		Err(e) => vec![check.input_failed("policy store", &e)],
	}
}

async fn wildcard_allow_policy(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let Some(store) = &ctx.policies else {
		return vec![check.input_missing("policy store")];
	};
	let policies = match store.list_policies().await {
		Ok(policies) => policies,
		Err(e) => return vec![check.input_failed("policy store", &e)],
	};

	policies
		.iter()
		.filter(|p| p.tool_pattern.trim() == "*" && p.action.eq_ignore_ascii_case("allow"))
		.map(|p| {
			let scope = if p.scope_id.is_empty() {
				p.scope.clone()
			} else {
				format!("{} {}", p.scope, p.scope_id)
			};
			check.finding(
				AuditSeverity::High,
				"Wildcard allow policy",
				format!("Policy {} allows every tool for {scope}.", p.id),
				"Replace the wildcard with the specific tools or groups needed.",
			)
		})
		.collect()
}

fn default_tool_policy(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	if !ctx.default_tool_policy.is_allow() {
		return Vec::new();
	}
	let severity = if ctx.is_production() {
		AuditSeverity::High
	} else {
		AuditSeverity::Low
	};
	vec![check.finding(
		severity,
		"Default tool policy allows unmatched tools",
		"Tools with no matching policy are permitted.",
		"Set RATCHET_DEFAULT_TOOL_POLICY=deny.",
	)]
}

fn sample_ids(ids: &[String]) -> String {
	let shown: Vec<&str> = ids.iter().take(5).map(String::as_str).collect();
	if ids.len() > shown.len() {
		format!("{} and {} more", shown.join(", "), ids.len() - shown.len())
	} else {
		shown.join(", ")
	}
}

async fn transcript_secret_exposure(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let Some(store) = &ctx.transcripts else {
		return vec![check.input_missing("transcript store")];
	};
	let transcripts = match store.list_unredacted(TRANSCRIPT_SCAN_LIMIT).await {
		Ok(rows) => rows,
		Err(e) => return vec![check.input_failed("transcript store", &e)],
	};

	let mut by_pattern: BTreeMap<SecretPattern, Vec<String>> = BTreeMap::new();
	let mut by_secret: BTreeMap<String, Vec<String>> = BTreeMap::new();
	for transcript in &transcripts {
		for pattern in detect(&transcript.content) {
			by_pattern.entry(pattern).or_default().push(transcript.id.clone());
		}
		if let Some(name) = ctx
			.guard
			.as_ref()
			.and_then(|g| g.contains_known_secret(&transcript.content))
		{
			by_secret.entry(name).or_default().push(transcript.id.clone());
		}
	}

	let mut findings: Vec<AuditFinding> = by_secret
		.into_iter()
		.map(|(name, ids)| {
			check.finding(
				AuditSeverity::Critical,
				format!("Stored secret '{name}' appears in transcripts"),
				format!("The value of secret '{name}' was found in transcripts {}.", sample_ids(&ids)),
				format!("Rotate '{name}' and redact the affected transcripts."),
			)
		})
		.collect();

	findings.extend(by_pattern.into_iter().map(|(pattern, ids)| {
		check.finding(
			pattern.severity(),
			format!("Possible {} in transcripts", pattern.label()),
			format!(
				"{} unredacted transcript(s) contain a {}: {}.",
				ids.len(),
				pattern.label(),
				sample_ids(&ids)
			),
			"Review and redact these transcripts, and rotate any credential that leaked.",
		)
	}));
	findings
}

fn is_shell(command: &str) -> bool {
	let base = Path::new(command.trim())
		.file_name()
		.and_then(|n| n.to_str())
		.unwrap_or("")
		.to_ascii_lowercase();
	let base = base.strip_suffix(".exe").unwrap_or(&base);
	SHELLS.contains(&base)
}

fn launches_shell(command: &str, args: &[String]) -> bool {
	if is_shell(command) {
		return true;
	}
	let launcher = Path::new(command.trim())
		.file_name()
		.and_then(|n| n.to_str())
		.unwrap_or("");
	launcher == "env" && args.iter().find(|a| !a.starts_with('-')).is_some_and(|a| is_shell(a))
}

async fn mcp_shell_execution(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let Some(store) = &ctx.mcp_servers else {
		return vec![check.input_missing("MCP server store")];
	};
	let servers = match store.list_mcp_servers().await {
		Ok(servers) => servers,
		Err(e) => return vec![check.input_failed("MCP server store", &e)],
	};

	servers
		.iter()
		.filter(|s| s.enabled && launches_shell(&s.command, &s.args))
		.map(|s| {
			check.finding(
				AuditSeverity::High,
				format!("MCP server '{}' runs a shell", s.name),
				format!("'{}' is launched via `{}`, which can execute arbitrary commands.", s.name, s.command),
				"Launch the MCP server binary directly instead of through a shell interpreter.",
			)
		})
		.collect()
}

fn rate_limiting(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	if ctx.services.is_registered(RATE_LIMIT_SERVICE) {
		return Vec::new();
	}
	vec![check.finding(
		AuditSeverity::High,
		"No rate limiting",
		format!("No '{RATE_LIMIT_SERVICE}' service is registered."),
		"Enable the rate limiter in front of the API and webhook endpoints.",
	)]
}

async fn database_file(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let Some(mode) = file_mode(&ctx.db_path).await else {
		return Vec::new();
	};
	if mode & 0o077 == 0 {
		return Vec::new();
	}
	vec![check.finding(
		AuditSeverity::Medium,
		"Database file is accessible to other users",
		format!("{} has mode {mode:o}.", ctx.db_path.display()),
		format!("chmod 600 {}", ctx.db_path.display()),
	)]
}

async fn webhook_signing(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let Some(store) = &ctx.webhooks else {
		return vec![check.input_missing("webhook store")];
	};
	let webhooks = match store.list_webhooks().await {
		Ok(webhooks) => webhooks,
		Err(e) => return vec![check.input_failed("webhook store", &e)],
	};

	let mut findings = Vec::new();
	for webhook in webhooks.iter().filter(|w| w.enabled) {
		if webhook.secret_name.is_empty() {
			findings.push(check.finding(
				AuditSeverity::High,
				format!("Webhook '{}' accepts unsigned requests", webhook.name),
				format!("Webhook '{}' ({}) has no signing secret.", webhook.name, webhook.source),
				"Configure a signing secret for the webhook.",
			));
			continue;
		}
		let Some(secrets) = &ctx.secrets else {
			continue;
		};
		match secrets.get(&webhook.secret_name).await {
			Ok(Some(_)) => {}
			Ok(None) => findings.push(check.finding(
				AuditSeverity::Medium,
				format!("Webhook '{}' signing secret is missing", webhook.name),
				format!(
					"Secret '{}' does not exist, so every delivery to '{}' is rejected.",
					webhook.secret_name, webhook.name
				),
				format!("Create secret '{}'.", webhook.secret_name),
			)),
			Err(e) => findings.push(check.input_failed("secret store", &e)),
		}
	}
	findings
}

async fn provider_credentials(check: AuditCheck, ctx: &AuditContext) -> Vec<AuditFinding> {
	let Some(store) = &ctx.providers else {
		return vec![check.input_missing("provider store")];
	};
	let providers = match store.list_providers().await {
		Ok(providers) => providers,
		Err(e) => return vec![check.input_failed("provider store", &e)],
	};

	let mut findings = Vec::new();
	for provider in &providers {
		let provider_type: ProviderType = match provider.provider_type.parse() {
			Ok(t) => t,
			Err(_) => {
				findings.push(check.finding(
					AuditSeverity::Low,
					format!("Provider '{}' has an unknown type", provider.alias),
					format!("Type '{}' has no client implementation.", provider.provider_type),
					"Fix or remove the provider record.",
				));
				continue;
			}
		};

		if provider.secret_name.is_empty() {
			if !provider_type.accepts_missing_credentials() {
				findings.push(check.finding(
					AuditSeverity::Medium,
					format!("Provider '{}' has no credentials", provider.alias),
					format!("{provider_type} providers need an API key secret."),
					"Set secret_name on the provider record.",
				));
			}
			continue;
		}

		let Some(secrets) = &ctx.secrets else {
			continue;
		};
		match secrets.get(&provider.secret_name).await {
			Ok(Some(_)) => {}
			Ok(None) => findings.push(check.finding(
				AuditSeverity::Medium,
				format!("Provider '{}' credential secret is missing", provider.alias),
				format!("Secret '{}' does not exist.", provider.secret_name),
				format!("Create secret '{}'.", provider.secret_name),
			)),
			Err(e) => findings.push(check.input_failed("secret store", &e)),
		}
	}
	findings
}
