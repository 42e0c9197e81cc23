// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tool access decisions.
//!
//! Evaluation reads every policy row on each call (no caching), keeps the
//! rows whose pattern matches the tool and whose scope applies to the
//! caller, then:
//!
//! 1. any matching deny denies,
//! 2. otherwise any matching allow allows,
//! 3. otherwise the engine's [`DefaultPolicy`] decides.
//!
//! A store failure always denies.

use std::sync::Arc;

use ratchet_common_config::DefaultPolicy;
use ratchet_server_db::{DbError, ToolPolicyRecord, ToolPolicyStore};
use tracing::instrument;

use crate::error::{PolicyError, PolicyResult};
use crate::groups::GroupRegistry;
use crate::pattern::ToolPattern;
use crate::types::{validate_parts, PolicyAction, PolicyDecision, ToolPolicy};

pub const STORE_ERROR_REASON: &str = "policy engine error; defaulting to deny";

pub struct PolicyEngine {
	store: Arc<dyn ToolPolicyStore>,
	default_policy: DefaultPolicy,
	groups: GroupRegistry,
}

impl PolicyEngine {
	pub fn new(store: Arc<dyn ToolPolicyStore>, default_policy: DefaultPolicy) -> Self {
		Self {
			store,
			default_policy,
			groups: GroupRegistry::new(),
		}
	}

	pub fn default_policy(&self) -> DefaultPolicy {
		self.default_policy
	}

	pub fn groups(&self) -> &GroupRegistry {
		&self.groups
	}

	#[instrument(level = "debug", skip(self), fields(default = %self.default_policy))]
	pub async fn is_allowed(&self, tool: &str, agent_id: &str, team_id: &str) -> PolicyDecision {
		let records = match self.store.list_policies().await {
			Ok(records) => records,
			Err(e) => {
				tracing::error!(error = %e, %tool, "failed to load tool policies");
				return PolicyDecision::deny(STORE_ERROR_REASON);
			}
		};

		let policies = parse_policies(&records);
		let decision = decide(&policies, tool, agent_id, team_id, self.default_policy, &self.groups);
		tracing::debug!(allowed = decision.allowed, reason = %decision.reason, "tool policy decision");
		decision
	}

	/// Validate and store a policy.
	#[instrument(skip(self))]
	pub async fn add_policy(
		&self,
		scope: &str,
		scope_id: &str,
		pattern: &str,
		action: &str,
	) -> PolicyResult<ToolPolicyRecord> {
		let (scope, pattern, action) = validate_parts(scope, scope_id, pattern, action)?;
		if let ToolPattern::Group(group) = &pattern {
			if !self.groups.exists(group) {
				return Err(PolicyError::InvalidArgument(format!("unknown tool group '{group}'")));
			}
		}

		let record = self
			.store
			.create_policy(scope.as_str(), scope_id, &pattern.to_string(), action.as_str())
			.await?;
		tracing::info!(policy_id = %record.id, %scope, %pattern, %action, "tool policy added");
		Ok(record)
	}

	#[instrument(skip(self))]
	pub async fn remove_policy(&self, id: &str) -> PolicyResult<()> {
		if !self.store.delete_policy(id).await? {
			return Err(PolicyError::NotFound(id.to_string()));
		}
		tracing::info!(policy_id = %id, "tool policy removed");
		Ok(())
	}

	pub async fn list_policies(&self) -> Result<Vec<ToolPolicyRecord>, DbError> {
		self.store.list_policies().await
	}

	/// Register an extra tool group. Built-in groups cannot be redefined.
	pub fn register_group(&self, name: &str, members: &[&str]) -> PolicyResult<()> {
		self.groups.register(name, members)
	}

	pub fn expand_group(&self, name: &str) -> Option<Vec<String>> {
		self.groups.expand(name)
	}
}

/// Parse rows, dropping any that are malformed.
pub fn parse_policies(records: &[ToolPolicyRecord]) -> Vec<ToolPolicy> {
	records
		.iter()
		.filter_map(|record| match ToolPolicy::try_from(record) {
			Ok(policy) => Some(policy),
			Err(e) => {
				tracing::debug!(policy_id = %record.id, error = %e, "skipping malformed tool policy");
				None
			}
		})
		.collect()
}

/// Pure decision over already-parsed policies.
pub fn decide(
	policies: &[ToolPolicy],
	tool: &str,
	agent_id: &str,
	team_id: &str,
	default_policy: DefaultPolicy,
	groups: &GroupRegistry,
) -> PolicyDecision {
	let matching: Vec<&ToolPolicy> = policies
		.iter()
		.filter(|p| p.pattern.matches(tool, groups))
		.filter(|p| p.applies_to(agent_id, team_id))
		.collect();

	if let Some(deny) = most_specific(&matching, PolicyAction::Deny) {
		return PolicyDecision::deny(format!("denied by {}", deny.describe()));
	}
	if let Some(allow) = most_specific(&matching, PolicyAction::Allow) {
		return PolicyDecision::allow(format!("allowed by {}", allow.describe()));
	}

	match default_policy {
		DefaultPolicy::Allow => PolicyDecision::allow("no matching policy; default allow"),
		DefaultPolicy::Deny => PolicyDecision::deny("no matching policy; default deny"),
	}
}

fn most_specific<'a>(matching: &[&'a ToolPolicy], action: PolicyAction) -> Option<&'a ToolPolicy> {
	matching
		.iter()
		.copied()
		.filter(|p| p.action == action)
		.max_by(|a, b| a.scope.cmp(&b.scope).then_with(|| b.id.cmp(&a.id)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::PolicyScope;
	use async_trait::async_trait;
	use chrono::Utc;
	use proptest::prelude::*;

	struct FailingStore;

	#[async_trait]
	impl ToolPolicyStore for FailingStore {
		async fn list_policies(&self) -> Result<Vec<ToolPolicyRecord>, DbError> {
			Err(DbError::Internal("database is offline".to_string()))
		}

		async fn create_policy(
			&self,
			_scope: &str,
			_scope_id: &str,
			_tool_pattern: &str,
			_action: &str,
		) -> Result<ToolPolicyRecord, DbError> {
			Err(DbError::Internal("database is offline".to_string()))
		}

		async fn delete_policy(&self, _id: &str) -> Result<bool, DbError> {
			Err(DbError::Internal("database is offline".to_string()))
		}

		async fn count_policies(&self) -> Result<i64, DbError> {
			Err(DbError::Internal("database is offline".to_string()))
		}
	}

	fn policy(id: &str, scope: PolicyScope, scope_id: &str, pattern: &str, action: PolicyAction) -> ToolPolicy {
		ToolPolicy {
			id: id.to_string(),
			scope,
			scope_id: scope_id.to_string(),
			pattern: ToolPattern::parse(pattern).unwrap(),
			action,
		}
	}

	fn record(id: &str, scope: &str, scope_id: &str, pattern: &str, action: &str) -> ToolPolicyRecord {
		ToolPolicyRecord {
			id: id.to_string(),
			scope: scope.to_string(),
			scope_id: scope_id.to_string(),
			tool_pattern: pattern.to_string(),
			action: action.to_string(),
			created_at: Utc::now(),
		}
	}

	const GROUP_FS: &[&str] = &["file_read", "file_write", "file_list"];

	#[test]
	fn deny_beats_more_specific_allow() {
		let groups = GroupRegistry::new();
		let policies = vec![
			policy("p1", PolicyScope::Global, "", "shell_exec", PolicyAction::Deny),
			policy("p2", PolicyScope::Team, "team-1", "shell_exec", PolicyAction::Allow),
		];
		let decision = decide(&policies, "shell_exec", "agent-1", "team-1", DefaultPolicy::Allow, &groups);
		assert!(!decision.allowed);
		assert!(decision.reason.contains("denied by global"), "{}", decision.reason);
	}

	#[test]
	fn deny_reason_names_most_specific_scope() {
		let groups = GroupRegistry::new();
		let policies = vec![
			policy("g", PolicyScope::Global, "", "*", PolicyAction::Deny),
			policy("a", PolicyScope::Agent, "agent-1", "shell_exec", PolicyAction::Deny),
		];
		let decision = decide(&policies, "shell_exec", "agent-1", "", DefaultPolicy::Deny, &groups);
		assert_eq!(decision.reason, "denied by agent policy a (scope_id: agent-1)");
	}

	#[test]
	fn group_deny_covers_members_only() {
		let groups = GroupRegistry::new();
		let policies = vec![policy("p", PolicyScope::Global, "", "group:fs", PolicyAction::Deny)];

		for tool in GROUP_FS {
			assert!(!decide(&policies, tool, "", "", DefaultPolicy::Allow, &groups).allowed);
		}
		let other = decide(&policies, "shell_exec", "", "", DefaultPolicy::Allow, &groups);
		assert_eq!(other, PolicyDecision::allow("no matching policy; default allow"));
		let closed = decide(&policies, "shell_exec", "", "", DefaultPolicy::Deny, &groups);
		assert_eq!(closed, PolicyDecision::deny("no matching policy; default deny"));
	}

	#[test]
	fn team_policy_ignored_for_other_teams() {
		let groups = GroupRegistry::new();
		let policies = vec![policy("t", PolicyScope::Team, "team-x", "*", PolicyAction::Deny)];
		assert!(decide(&policies, "web_fetch", "a", "team-y", DefaultPolicy::Allow, &groups).allowed);
		assert!(decide(&policies, "web_fetch", "a", "", DefaultPolicy::Allow, &groups).allowed);
		assert!(!decide(&policies, "web_fetch", "a", "team-x", DefaultPolicy::Allow, &groups).allowed);
	}

	#[test]
	fn empty_rule_set_uses_default() {
		let groups = GroupRegistry::new();
		assert!(!decide(&[], "anything", "", "", DefaultPolicy::default(), &groups).allowed);
		assert!(decide(&[], "anything", "", "", DefaultPolicy::Allow, &groups).allowed);
	}

	#[test]
	fn malformed_rows_are_skipped() {
		let records = vec![
			record("ok", "global", "", "shell_exec", "deny"),
			record("bad-scope", "planet", "", "*", "allow"),
			record("bad-action", "global", "", "*", "maybe"),
			record("bad-pattern", "global", "", "", "allow"),
			record("team-no-id", "team", "", "*", "allow"),
			record("global-with-id", "global", "legacy", "*", "deny"),
		];
		let parsed = parse_policies(&records);
		let ids: Vec<_> = parsed.iter().map(|p| p.id.as_str()).collect();
		assert_eq!(ids, vec!["ok", "team-no-id", "global-with-id"]);
	}

	#[tokio::test]
	async fn store_error_denies() {
		let engine = PolicyEngine::new(Arc::new(FailingStore), DefaultPolicy::Allow);
		let decision = engine.is_allowed("file_read", "a", "t").await;
		assert_eq!(decision, PolicyDecision::deny(STORE_ERROR_REASON));
	}

	#[tokio::test]
	async fn admin_operations_roundtrip() {
		let pool = ratchet_server_db::testing::create_test_pool().await.unwrap();
		let store = Arc::new(ratchet_server_db::ToolPolicyRepository::new(pool));
		let engine = PolicyEngine::new(store, DefaultPolicy::Deny);

		let record = engine.add_policy("global", "", "group:web", "allow").await.unwrap();
		assert!(engine.is_allowed("web_fetch", "a", "t").await.allowed);

		assert!(matches!(
			engine.add_policy("global", "", "group:nope", "allow").await,
			Err(PolicyError::InvalidArgument(_))
		));
		assert!(matches!(
			engine.add_policy("team", "", "*", "allow").await,
			Err(PolicyError::InvalidArgument(_))
		));

		engine.remove_policy(&record.id).await.unwrap();
		assert!(matches!(
			engine.remove_policy(&record.id).await,
			Err(PolicyError::NotFound(_))
		));
		assert!(!engine.is_allowed("web_fetch", "a", "t").await.allowed);
		assert!(engine.list_policies().await.unwrap().is_empty());
	}

	async fn insert_raw(pool: &ratchet_server_db::SqlitePool, row: (&str, &str, &str, &str, &str, &str)) {
		sqlx::query(
			"INSERT INTO tool_policies (id, scope, scope_id, tool_pattern, action, created_at) VALUES (?, ?, ?, ?, ?, ?)",
		)
		.bind(row.0)
		.bind(row.1)
		.bind(row.2)
		.bind(row.3)
		.bind(row.4)
		.bind(row.5)
		.execute(pool)
		.await
		.unwrap();
	}

	#[tokio::test]
	async fn stored_global_deny_with_scope_id_still_applies() {
		let pool = ratchet_server_db::testing::create_test_pool().await.unwrap();
		insert_raw(&pool, ("g1", "global", "legacy", "shell_exec", "deny", "2025-01-02T03:04:05Z")).await;
		let store = Arc::new(ratchet_server_db::ToolPolicyRepository::new(pool));
		let engine = PolicyEngine::new(store, DefaultPolicy::Allow);

		let decision = engine.is_allowed("shell_exec", "a", "t").await;
		assert!(!decision.allowed);
		assert!(decision.reason.contains("g1"), "{}", decision.reason);
	}

	#[tokio::test]
	async fn stored_team_row_without_scope_id_matches_empty_team() {
		let pool = ratchet_server_db::testing::create_test_pool().await.unwrap();
		insert_raw(&pool, ("t1", "team", "", "file_read", "deny", "2025-01-02T03:04:05Z")).await;
		let store = Arc::new(ratchet_server_db::ToolPolicyRepository::new(pool));
		let engine = PolicyEngine::new(store, DefaultPolicy::Allow);

		assert!(!engine.is_allowed("file_read", "a", "").await.allowed);
		assert!(engine.is_allowed("file_read", "a", "team-1").await.allowed);
	}

	#[tokio::test]
	async fn bad_timestamp_row_does_not_poison_decisions() {
		let pool = ratchet_server_db::testing::create_test_pool().await.unwrap();
		insert_raw(&pool, ("ok", "global", "", "web_fetch", "allow", "2025-01-02T03:04:05Z")).await;
		insert_raw(&pool, ("bad", "global", "", "shell_exec", "deny", "not a time")).await;
		let store = Arc::new(ratchet_server_db::ToolPolicyRepository::new(pool));
		let engine = PolicyEngine::new(store, DefaultPolicy::Deny);

		let decision = engine.is_allowed("web_fetch", "a", "t").await;
		assert!(decision.allowed, "{}", decision.reason);
		assert_ne!(decision.reason, STORE_ERROR_REASON);
	}

	#[tokio::test]
	async fn registered_group_is_usable() {
		let pool = ratchet_server_db::testing::create_test_pool().await.unwrap();
		let store = Arc::new(ratchet_server_db::ToolPolicyRepository::new(pool));
		let engine = PolicyEngine::new(store, DefaultPolicy::Allow);

		engine.register_group("browser", &["browser_open"]).unwrap();
		assert!(engine.register_group("git", &["browser_open"]).is_err());
		assert_eq!(engine.expand_group("browser").unwrap(), vec!["browser_open"]);

		engine.add_policy("agent", "agent-7", "group:browser", "deny").await.unwrap();
		assert!(!engine.is_allowed("browser_open", "agent-7", "").await.allowed);
		assert!(engine.is_allowed("browser_open", "agent-8", "").await.allowed);
	}

	fn tool_name() -> impl Strategy<Value = String> {
		prop_oneof![
			Just("shell_exec".to_string()),
			Just("file_read".to_string()),
			Just("web_fetch".to_string()),
			"[a-z_]{1,12}",
		]
	}

	proptest! {
		#[test]
		fn prop_any_matching_deny_wins(
			tool in tool_name(),
			deny_scope in 0u8..3,
			default_allow in any::<bool>(),
		) {
			let groups = GroupRegistry::new();
			let (scope, scope_id) = match deny_scope {
				0 => (PolicyScope::Global, ""),
				1 => (PolicyScope::Team, "team-1"),
				_ => (PolicyScope::Agent, "agent-1"),
			};
			let policies = vec![
				policy("ga", PolicyScope::Global, "", &tool, PolicyAction::Allow),
				policy("ta", PolicyScope::Team, "team-1", &tool, PolicyAction::Allow),
				policy("aa", PolicyScope::Agent, "agent-1", "*", PolicyAction::Allow),
				policy("d", scope, scope_id, &tool, PolicyAction::Deny),
			];
			let default = if default_allow { DefaultPolicy::Allow } else { DefaultPolicy::Deny };
			let decision = decide(&policies, &tool, "agent-1", "team-1", default, &groups);
			prop_assert!(!decision.allowed);
		}

		#[test]
		fn prop_group_fs_deny_is_exact(tool in tool_name()) {
			let groups = GroupRegistry::new();
			let policies = vec![policy("p", PolicyScope::Global, "", "group:fs", PolicyAction::Deny)];
			let decision = decide(&policies, &tool, "", "", DefaultPolicy::Allow, &groups);
			prop_assert_eq!(decision.allowed, !GROUP_FS.contains(&tool.as_str()));
		}

		#[test]
		fn prop_other_team_policies_have_no_effect(
			tool in tool_name(),
			team in "team-[a-z]{1,4}",
			action_deny in any::<bool>(),
			default_allow in any::<bool>(),
		) {
			prop_assume!(team != "team-x");
			let groups = GroupRegistry::new();
			let action = if action_deny { PolicyAction::Deny } else { PolicyAction::Allow };
			let policies = vec![policy("t", PolicyScope::Team, "team-x", "*", action)];
			let default = if default_allow { DefaultPolicy::Allow } else { DefaultPolicy::Deny };
			let with = decide(&policies, &tool, "a", &team, default, &groups);
			let without = decide(&[], &tool, "a", &team, default, &groups);
			prop_assert_eq!(with, without);
		}
	}
}
