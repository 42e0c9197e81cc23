// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use crate::error::{PolicyError, PolicyResult};
use crate::groups::GroupRegistry;

const GROUP_PREFIX: &str = "group:";

/// A parsed `tool_pattern` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolPattern {
	/// `file_read`
	Exact(String),
	/// `*`
	Any,
	/// `group:fs`
	Group(String),
	/// `mcp_*`
	Prefix(String),
}

impl ToolPattern {
	pub fn parse(raw: &str) -> PolicyResult<Self> {
		let raw = raw.trim();
		if raw.is_empty() {
			return Err(PolicyError::InvalidArgument("tool pattern is empty".to_string()));
		}
		if raw == "*" {
			return Ok(ToolPattern::Any);
		}
		if let Some(group) = raw.strip_prefix(GROUP_PREFIX) {
			if group.is_empty() {
				return Err(PolicyError::InvalidArgument(
					"group pattern has no group name".to_string(),
				));
			}
			return Ok(ToolPattern::Group(group.to_string()));
		}
		if let Some(prefix) = raw.strip_suffix('*') {
			if prefix.contains('*') {
				return Err(PolicyError::InvalidArgument(format!(
					"pattern '{raw}' may only have a trailing '*'"
				)));
			}
			return Ok(ToolPattern::Prefix(prefix.to_string()));
		}
		if raw.contains('*') {
			return Err(PolicyError::InvalidArgument(format!(
				"pattern '{raw}' may only have a trailing '*'"
			)));
		}
		Ok(ToolPattern::Exact(raw.to_string()))
	}

	pub fn matches(&self, tool: &str, groups: &GroupRegistry) -> bool {
		match self {
			ToolPattern::Exact(name) => name == tool,
			ToolPattern::Any => true,
			ToolPattern::Group(group) => groups.contains(group, tool),
			ToolPattern::Prefix(prefix) => tool.starts_with(prefix.as_str()),
		}
	}
}

impl fmt::Display for ToolPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ToolPattern::Exact(name) => f.write_str(name),
			ToolPattern::Any => f.write_str("*"),
			ToolPattern::Group(group) => write!(f, "{GROUP_PREFIX}{group}"),
			ToolPattern::Prefix(prefix) => write!(f, "{prefix}*"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn parses_every_form() {
		assert_eq!(ToolPattern::parse("file_read").unwrap(), ToolPattern::Exact("file_read".into()));
		assert_eq!(ToolPattern::parse("*").unwrap(), ToolPattern::Any);
		assert_eq!(ToolPattern::parse("group:fs").unwrap(), ToolPattern::Group("fs".into()));
		assert_eq!(ToolPattern::parse("mcp_*").unwrap(), ToolPattern::Prefix("mcp_".into()));
	}

	#[test]
	fn rejects_malformed() {
		for raw in ["", "   ", "group:", "a*b", "*a*"] {
			assert!(ToolPattern::parse(raw).is_err(), "{raw:?}");
		}
	}

	#[test]
	fn prefix_glob_matches_by_prefix() {
		let groups = GroupRegistry::new();
		let pattern = ToolPattern::parse("mcp_*").unwrap();
		assert!(pattern.matches("mcp_anything", &groups));
		assert!(!pattern.matches("mcp", &groups));
		assert!(pattern.matches("mcp_", &groups));
		assert!(!pattern.matches("xmcp_a", &groups));
	}

	#[test]
	fn unknown_group_matches_nothing() {
		let groups = GroupRegistry::new();
		assert!(!ToolPattern::Group("nope".into()).matches("file_read", &groups));
	}

	proptest! {
		#[test]
		fn prop_display_roundtrips(raw in "(\\*|group:[a-z]{1,8}|[a-z_]{1,12}\\*?)") {
			let parsed = ToolPattern::parse(&raw).unwrap();
			prop_assert_eq!(parsed.to_string(), raw);
		}

		#[test]
		fn prop_prefix_matches_extensions(prefix in "[a-z_]{1,8}", rest in "[a-z_]{1,8}") {
			let groups = GroupRegistry::new();
			let pattern = ToolPattern::Prefix(prefix.clone());
			let extended = format!("{prefix}{rest}");
			prop_assert!(pattern.matches(&extended, &groups));
			prop_assert!(!pattern.matches(&prefix[..prefix.len() - 1], &groups));
		}
	}
}
