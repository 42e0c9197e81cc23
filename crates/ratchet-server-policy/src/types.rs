// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use ratchet_server_db::ToolPolicyRecord;
use serde::Serialize;

use crate::error::PolicyError;
use crate::pattern::ToolPattern;

/// Breadth over which a policy applies. Ordered from broadest to most
/// specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyScope {
	Global,
	Team,
	Agent,
}

impl PolicyScope {
	pub fn as_str(&self) -> &'static str {
		match self {
			PolicyScope::Global => "global",
			PolicyScope::Team => "team",
			PolicyScope::Agent => "agent",
		}
	}
}

impl fmt::Display for PolicyScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PolicyScope {
	type Err = PolicyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"global" => Ok(PolicyScope::Global),
			"team" => Ok(PolicyScope::Team),
			"agent" => Ok(PolicyScope::Agent),
			_ => Err(PolicyError::InvalidArgument(format!(
				"unknown scope '{s}', expected 'global', 'team', or 'agent'"
			))),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
	Allow,
	Deny,
}

impl PolicyAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			PolicyAction::Allow => "allow",
			PolicyAction::Deny => "deny",
		}
	}
}

impl fmt::Display for PolicyAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PolicyAction {
	type Err = PolicyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"allow" => Ok(PolicyAction::Allow),
			"deny" => Ok(PolicyAction::Deny),
			_ => Err(PolicyError::InvalidArgument(format!(
				"unknown action '{s}', expected 'allow' or 'deny'"
			))),
		}
	}
}

/// A validated policy row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPolicy {
	pub id: String,
	pub scope: PolicyScope,
	pub scope_id: String,
	pub pattern: ToolPattern,
	pub action: PolicyAction,
}

impl ToolPolicy {
	/// Whether this policy applies to a caller in `team_id` running as
	/// `agent_id`.
	pub fn applies_to(&self, agent_id: &str, team_id: &str) -> bool {
		match self.scope {
			PolicyScope::Global => true,
			PolicyScope::Team => self.scope_id == team_id,
			PolicyScope::Agent => self.scope_id == agent_id,
		}
	}

	pub fn describe(&self) -> String {
		if self.scope_id.is_empty() {
			format!("{} policy {}", self.scope, self.id)
		} else {
			format!("{} policy {} (scope_id: {})", self.scope, self.id, self.scope_id)
		}
	}
}

/// Parse the scope, pattern and action of a policy without checking how
/// `scope_id` is used. Stored rows go through this path.
pub(crate) fn parse_parts(
	scope: &str,
	pattern: &str,
	action: &str,
) -> Result<(PolicyScope, ToolPattern, PolicyAction), PolicyError> {
	Ok((scope.parse()?, ToolPattern::parse(pattern)?, action.parse()?))
}

/// Validate the parts of a new policy. Team and agent scopes need a scope id;
/// global must not have one.
pub(crate) fn validate_parts(
	scope: &str,
	scope_id: &str,
	pattern: &str,
	action: &str,
) -> Result<(PolicyScope, ToolPattern, PolicyAction), PolicyError> {
	let parts = parse_parts(scope, pattern, action)?;
	match parts.0 {
		PolicyScope::Global if !scope_id.is_empty() => Err(PolicyError::InvalidArgument(
			"global policies take no scope_id".to_string(),
		)),
		PolicyScope::Team | PolicyScope::Agent if scope_id.is_empty() => Err(
			PolicyError::InvalidArgument(format!("{} policies require a scope_id", parts.0)),
		),
		_ => Ok(parts),
	}
}

impl TryFrom<&ToolPolicyRecord> for ToolPolicy {
	type Error = PolicyError;

	fn try_from(record: &ToolPolicyRecord) -> Result<Self, Self::Error> {
		let (scope, pattern, action) =
			parse_parts(&record.scope, &record.tool_pattern, &record.action)?;
		Ok(ToolPolicy {
			id: record.id.clone(),
			scope,
			scope_id: record.scope_id.clone(),
			pattern,
			action,
		})
	}
}

/// Answer to "may this agent call this tool?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
	pub allowed: bool,
	pub reason: String,
}

impl PolicyDecision {
	pub fn allow(reason: impl Into<String>) -> Self {
		Self {
			allowed: true,
			reason: reason.into(),
		}
	}

	pub fn deny(reason: impl Into<String>) -> Self {
		Self {
			allowed: false,
			reason: reason.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scope_rules() {
		assert!(validate_parts("global", "", "*", "allow").is_ok());
		assert!(validate_parts("global", "x", "*", "allow").is_err());
		assert!(validate_parts("team", "", "*", "allow").is_err());
		assert!(validate_parts("agent", "agent-1", "shell_exec", "DENY").is_ok());
		assert!(validate_parts("org", "o", "*", "allow").is_err());
		assert!(validate_parts("global", "", "*", "maybe").is_err());
	}

	#[test]
	fn stored_rows_keep_unusual_scope_ids() {
		let record = |scope: &str, scope_id: &str| ToolPolicyRecord {
			id: "p1".to_string(),
			scope: scope.to_string(),
			scope_id: scope_id.to_string(),
			tool_pattern: "shell_exec".to_string(),
			action: "deny".to_string(),
			created_at: chrono::Utc::now(),
		};

		let global = ToolPolicy::try_from(&record("global", "legacy")).unwrap();
		assert!(global.applies_to("agent-1", "team-1"));

		let team = ToolPolicy::try_from(&record("team", "")).unwrap();
		assert!(team.applies_to("agent-1", ""));
		assert!(!team.applies_to("agent-1", "team-1"));

		assert!(ToolPolicy::try_from(&record("org", "o")).is_err());
	}

	#[test]
	fn describe_includes_scope_id() {
		let policy = ToolPolicy {
			id: "p1".to_string(),
			scope: PolicyScope::Team,
			scope_id: "team-1".to_string(),
			pattern: ToolPattern::Any,
			action: PolicyAction::Deny,
		};
		assert_eq!(policy.describe(), "team policy p1 (scope_id: team-1)");
	}
}
