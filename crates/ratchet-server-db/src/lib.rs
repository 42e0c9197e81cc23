// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the Ratchet server.
//!
//! Each table has a `*Store` trait for consumers and a `*Repository`
//! implementation backed by a [`sqlx::SqlitePool`].

pub mod error;
pub mod mcp_server;
pub mod pool;
pub mod provider;
pub mod schema;
pub mod testing;
pub mod tool_policy;
pub mod transcript;
mod types;
pub mod webhook;

pub use error::{DbError, Result};
pub use mcp_server::{McpServerRecord, McpServerRepository, McpServerStore};
pub use pool::{create_pool, open};
pub use provider::{
	LlmProviderRecord, LlmProviderRepository, LlmProviderStore, LlmProviderUpdate, NewLlmProvider,
};
pub use schema::apply_schema;
pub use sqlx::SqlitePool;
pub use tool_policy::{ToolPolicyRecord, ToolPolicyRepository, ToolPolicyStore};
pub use transcript::{TranscriptRecord, TranscriptRepository, TranscriptStore};
pub use webhook::{NewWebhook, WebhookRecord, WebhookRepository, WebhookStore};
