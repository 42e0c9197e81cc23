// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tool access policy engine.
//!
//! Policies are scoped to everyone (global), a team, or a single agent, and
//! match tools by exact name, `*`, a `group:<name>` reference, or a
//! `<prefix>*` glob. Any matching deny wins over every allow.

pub mod engine;
pub mod error;
pub mod groups;
pub mod pattern;
pub mod types;

pub use engine::{decide, parse_policies, PolicyEngine, STORE_ERROR_REASON};
pub use error::{PolicyError, PolicyResult};
pub use groups::{GroupRegistry, BUILTIN_GROUPS};
pub use pattern::ToolPattern;
pub use types::{PolicyAction, PolicyDecision, PolicyScope, ToolPolicy};
