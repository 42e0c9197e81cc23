// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `ratchet` administration binary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ratchet_common_config::{load_config, load_config_with_file, SecretString};
use ratchet_server::{init_tracing, RatchetCore};
use ratchet_server_db::NewLlmProvider;
use ratchet_server_secrets::{VaultBackend, VaultConfig};
use ratchet_server_security_audit::AuditSeverity;
use tokio::io::AsyncReadExt;

/// Ratchet - secrets, tool policy, and security audit for agent hosts.
#[derive(Parser, Debug)]
#[command(name = "ratchet", about = "Ratchet agent security plane", version)]
struct Args {
	/// TOML config file (defaults to $RATCHET_CONFIG or /etc/ratchet/ratchet.toml)
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the security self-audit
	Audit {
		/// Print the report as JSON
		#[arg(long)]
		json: bool,
		/// Exit non-zero when any finding is at or above this severity
		#[arg(long, value_parser = parse_severity)]
		fail_on: Option<AuditSeverity>,
	},
	/// Manage tool access policies
	#[command(subcommand)]
	Policy(PolicyCommand),
	/// Manage the vault backend configuration
	#[command(subcommand)]
	Vault(VaultCommand),
	/// Manage secrets in the local store
	#[command(subcommand)]
	Secret(SecretCommand),
	/// Manage LLM providers
	#[command(subcommand)]
	Provider(ProviderCommand),
}

#[derive(Subcommand, Debug)]
enum PolicyCommand {
	/// Decide whether an agent may call a tool
	Check {
		tool: String,
		#[arg(long, default_value = "")]
		agent: String,
		#[arg(long, default_value = "")]
		team: String,
	},
	List,
	Add {
		/// global, team, or agent
		#[arg(long)]
		scope: String,
		#[arg(long, default_value = "")]
		scope_id: String,
		/// Tool name, `*`, `group:<name>`, or `<prefix>*`
		#[arg(long)]
		pattern: String,
		/// allow or deny
		#[arg(long)]
		action: String,
	},
	Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum VaultCommand {
	Show,
	Set {
		/// dev or remote
		#[arg(long)]
		backend: VaultBackend,
		#[arg(long)]
		address: Option<String>,
		/// Read the vault token from stdin
		#[arg(long)]
		token_stdin: bool,
		#[arg(long)]
		mount_path: Option<String>,
		#[arg(long)]
		namespace: Option<String>,
	},
	Delete,
}

#[derive(Subcommand, Debug)]
enum SecretCommand {
	/// Store a secret; the value is read from stdin unless --value is given
	Set {
		name: String,
		#[arg(long)]
		value: Option<String>,
	},
	Delete { name: String },
	List,
}

#[derive(Subcommand, Debug)]
enum ProviderCommand {
	List,
	/// Probe a provider's endpoint
	Test { alias: String },
	Add {
		alias: String,
		/// mock, anthropic, openai, openrouter, or ollama
		#[arg(long = "type")]
		provider_type: String,
		#[arg(long)]
		model: String,
		#[arg(long, default_value = "")]
		secret_name: String,
		#[arg(long, default_value = "")]
		base_url: String,
		#[arg(long, default_value_t = 4096)]
		max_tokens: i64,
		#[arg(long)]
		default: bool,
	},
	Remove { alias: String },
	SetDefault { alias: String },
}

fn parse_severity(s: &str) -> Result<AuditSeverity, String> {
	match s.to_lowercase().as_str() {
		"info" => Ok(AuditSeverity::Info),
		"low" => Ok(AuditSeverity::Low),
		"medium" => Ok(AuditSeverity::Medium),
		"high" => Ok(AuditSeverity::High),
		"critical" => Ok(AuditSeverity::Critical),
		_ => Err(format!("unknown severity '{s}'")),
	}
}

async fn read_stdin_value() -> anyhow::Result<String> {
	let mut buf = String::new();
	tokio::io::stdin()
		.read_to_string(&mut buf)
		.await
		.context("failed to read value from stdin")?;
	Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let args = Args::parse();

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => load_config_with_file(path.clone())?,
		None => load_config()?,
	};

	let guard = RatchetCore::file_guard(&config);
	init_tracing(&config.logging, Some(guard.clone())).context("failed to initialise tracing")?;

	let core = RatchetCore::open_with_guard(config, guard).await?;
	run(&core, args.command).await
}

async fn run(core: &RatchetCore, command: Command) -> anyhow::Result<ExitCode> {
	match command {
		Command::Audit { json, fail_on } => {
			let report = core.audit().await;
			if json {
				println!("{}", serde_json::to_string_pretty(&report)?);
			} else {
				println!("Security score: {}/100", report.score);
				for severity in AuditSeverity::all() {
					println!("  {severity:<8} {}", report.count(*severity));
				}
				for finding in &report.findings {
					println!();
					println!("[{}] {} ({})", finding.severity, finding.title, finding.check);
					println!("  {}", finding.description);
					println!("  -> {}", finding.recommendation);
				}
			}
			let failed = fail_on.is_some_and(|min| report.highest_severity().is_some_and(|s| s >= min));
			return Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS });
		}

		Command::Policy(cmd) => match cmd {
			PolicyCommand::Check { tool, agent, team } => {
				let decision = core.policy().is_allowed(&tool, &agent, &team).await;
				let verdict = if decision.allowed { "allowed" } else { "denied" };
				println!("{verdict}: {}", decision.reason);
				if !decision.allowed {
					return Ok(ExitCode::FAILURE);
				}
			}
			PolicyCommand::List => {
				for p in core.policy().list_policies().await? {
					let scope = if p.scope_id.is_empty() {
						p.scope.clone()
					} else {
						format!("{}:{}", p.scope, p.scope_id)
					};
					println!("{}\t{scope}\t{}\t{}", p.id, p.tool_pattern, p.action);
				}
			}
			PolicyCommand::Add {
				scope,
				scope_id,
				pattern,
				action,
			} => {
				let record = core.policy().add_policy(&scope, &scope_id, &pattern, &action).await?;
				println!("{}", record.id);
			}
			PolicyCommand::Remove { id } => core.policy().remove_policy(&id).await?,
		},

		Command::Vault(cmd) => match cmd {
			VaultCommand::Show => match core.vault_config().await? {
				None => println!("no vault configuration"),
				Some(vault) => {
					println!("backend:    {}", vault.backend);
					println!("address:    {}", vault.address.as_deref().unwrap_or("-"));
					println!("mount_path: {}", vault.mount_path.as_deref().unwrap_or("-"));
					println!("namespace:  {}", vault.namespace.as_deref().unwrap_or("-"));
					let token = vault.token.as_ref().filter(|t| !t.is_empty());
					println!("token:      {}", if token.is_some() { "set" } else { "unset" });
				}
			},
			VaultCommand::Set {
				backend,
				address,
				token_stdin,
				mount_path,
				namespace,
			} => {
				let token = if token_stdin {
					Some(SecretString::new(read_stdin_value().await?))
				} else {
					None
				};
				core.save_vault_config(&VaultConfig {
					backend,
					address,
					token,
					mount_path,
					namespace,
				})
				.await?;
				println!("vault configuration saved");
			}
			VaultCommand::Delete => {
				if core.delete_vault_config().await? {
					println!("vault configuration deleted");
				} else {
					println!("no vault configuration");
				}
			}
		},

		Command::Secret(cmd) => match cmd {
			SecretCommand::Set { name, value } => {
				let value = match value {
					Some(v) => v,
					None => read_stdin_value().await?,
				};
				core.secrets().set(&name, SecretString::new(value)).await?;
				println!("secret '{name}' stored");
			}
			SecretCommand::Delete { name } => {
				core.secrets().delete(&name).await?;
				println!("secret '{name}' deleted");
			}
			SecretCommand::List => {
				for name in core.secrets().list().await? {
					println!("{name}");
				}
			}
		},

		Command::Provider(cmd) => match cmd {
			ProviderCommand::List => {
				for p in core.providers().list_providers().await? {
					let marker = if p.is_default { "*" } else { " " };
					println!("{marker} {}\t{}\t{}", p.alias, p.provider_type, p.model);
				}
			}
			ProviderCommand::Test { alias } => {
				let result = core.providers().test_connection(&alias).await?;
				println!("{}", serde_json::to_string_pretty(&result)?);
				if !result.ok {
					return Ok(ExitCode::FAILURE);
				}
			}
			ProviderCommand::Add {
				alias,
				provider_type,
				model,
				secret_name,
				base_url,
				max_tokens,
				default,
			} => {
				let record = core
					.providers()
					.add_provider(NewLlmProvider {
						alias,
						provider_type,
						model,
						secret_name,
						base_url,
						max_tokens,
						is_default: default,
					})
					.await?;
				println!("{}", record.id);
			}
			ProviderCommand::Remove { alias } => core.providers().remove_provider(&alias).await?,
			ProviderCommand::SetDefault { alias } => core.providers().set_default(&alias).await?,
		},
	}
	Ok(ExitCode::SUCCESS)
}
