// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Table definitions. Every statement is idempotent.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS llm_providers (
		id TEXT PRIMARY KEY,
		alias TEXT NOT NULL UNIQUE,
		type TEXT NOT NULL,
		model TEXT NOT NULL DEFAULT '',
		secret_name TEXT NOT NULL DEFAULT '',
		base_url TEXT NOT NULL DEFAULT '',
		max_tokens INTEGER NOT NULL DEFAULT 0,
		is_default INTEGER NOT NULL DEFAULT 0,
		created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
		updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS tool_policies (
		id TEXT PRIMARY KEY,
		scope TEXT NOT NULL,
		scope_id TEXT NOT NULL DEFAULT '',
		tool_pattern TEXT NOT NULL,
		action TEXT NOT NULL,
		created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS webhooks (
		id TEXT PRIMARY KEY,
		source TEXT NOT NULL,
		name TEXT NOT NULL UNIQUE,
		secret_name TEXT NOT NULL DEFAULT '',
		filter TEXT NOT NULL DEFAULT '',
		task_template TEXT NOT NULL DEFAULT '',
		enabled INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS transcripts (
		id TEXT PRIMARY KEY,
		agent_id TEXT NOT NULL DEFAULT '',
		task_id TEXT NOT NULL DEFAULT '',
		role TEXT NOT NULL,
		content TEXT NOT NULL,
		redacted INTEGER NOT NULL DEFAULT 0,
		created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS mcp_servers (
		id TEXT PRIMARY KEY,
		name TEXT NOT NULL UNIQUE,
		command TEXT NOT NULL DEFAULT '',
		args TEXT NOT NULL DEFAULT '[]',
		url TEXT NOT NULL DEFAULT '',
		enabled INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_tool_policies_scope ON tool_policies(scope, scope_id)",
	"CREATE INDEX IF NOT EXISTS idx_transcripts_redacted ON transcripts(redacted)",
];

/// Create every Ratchet table and index that does not exist yet.
#[tracing::instrument(skip(pool))]
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), DbError> {
	let mut tx = pool.begin().await?;
	for statement in STATEMENTS {
		sqlx::query(statement).execute(&mut *tx).await?;
	}
	tx.commit().await?;
	tracing::debug!(statements = STATEMENTS.len(), "schema applied");
	Ok(())
}
