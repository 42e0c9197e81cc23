// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Named tool groups referenced by `group:<name>` patterns.
//!
//! The built-in groups are fixed. Extra groups may be registered at startup
//! but can never shadow a built-in.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::{PolicyError, PolicyResult};

pub const BUILTIN_GROUPS: &[(&str, &[&str])] = &[
	("fs", &["file_read", "file_write", "file_list"]),
	("runtime", &["shell_exec"]),
	("web", &["web_fetch"]),
	("git", &["git_clone", "git_status", "git_commit", "git_push", "git_diff"]),
	("task", &["task_create", "task_update"]),
	("message", &["message_send"]),
];

pub fn is_builtin(name: &str) -> bool {
	BUILTIN_GROUPS.iter().any(|(group, _)| *group == name)
}

pub struct GroupRegistry {
	extra: RwLock<BTreeMap<String, Vec<String>>>,
}

impl Default for GroupRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl GroupRegistry {
	pub fn new() -> Self {
		Self {
			extra: RwLock::new(BTreeMap::new()),
		}
	}

	/// Add or replace a non-built-in group.
	pub fn register(&self, name: &str, members: &[&str]) -> PolicyResult<()> {
		let name = name.trim();
		if name.is_empty() {
			return Err(PolicyError::InvalidArgument("group name is empty".to_string()));
		}
		if is_builtin(name) {
			return Err(PolicyError::InvalidArgument(format!(
				"group '{name}' is built in and cannot be redefined"
			)));
		}
		let members: Vec<String> = members
			.iter()
			.map(|m| m.trim())
			.filter(|m| !m.is_empty())
			.map(str::to_string)
			.collect();
		if members.is_empty() {
			return Err(PolicyError::InvalidArgument(format!(
				"group '{name}' has no members"
			)));
		}

		self.extra.write().insert(name.to_string(), members);
		tracing::info!(group = %name, "tool group registered");
		Ok(())
	}

	/// Members of `name`, or `None` if no such group exists.
	pub fn expand(&self, name: &str) -> Option<Vec<String>> {
		if let Some((_, members)) = BUILTIN_GROUPS.iter().find(|(group, _)| *group == name) {
			return Some(members.iter().map(|m| m.to_string()).collect());
		}
		self.extra.read().get(name).cloned()
	}

	pub fn exists(&self, name: &str) -> bool {
		is_builtin(name) || self.extra.read().contains_key(name)
	}

	pub fn contains(&self, name: &str, tool: &str) -> bool {
		if let Some((_, members)) = BUILTIN_GROUPS.iter().find(|(group, _)| *group == name) {
			return members.contains(&tool);
		}
		self
			.extra
			.read()
			.get(name)
			.is_some_and(|members| members.iter().any(|m| m == tool))
	}

	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = BUILTIN_GROUPS.iter().map(|(g, _)| g.to_string()).collect();
		names.extend(self.extra.read().keys().cloned());
		names
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_groups_expand() {
		let groups = GroupRegistry::new();
		assert_eq!(
			groups.expand("fs").unwrap(),
			vec!["file_read", "file_write", "file_list"]
		);
		assert_eq!(groups.expand("git").unwrap().len(), 5);
		assert!(groups.expand("nope").is_none());
	}

	#[test]
	fn builtins_cannot_be_redefined() {
		let groups = GroupRegistry::new();
		assert!(groups.register("fs", &["rm_rf"]).is_err());
		assert!(!groups.contains("fs", "rm_rf"));
	}

	#[test]
	fn custom_group_registration() {
		let groups = GroupRegistry::new();
		groups.register("browser", &["browser_open", "browser_click"]).unwrap();
		assert!(groups.contains("browser", "browser_click"));
		assert!(!groups.contains("browser", "file_read"));
		assert!(groups.exists("browser"));
		assert!(groups.register("empty", &[" "]).is_err());
		assert!(groups.register("", &["x"]).is_err());
	}
}
