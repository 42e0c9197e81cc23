// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Agent transcript rows. `redacted` records whether secret values were
//! scrubbed from `content` before it was stored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::new_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
	pub id: String,
	pub agent_id: String,
	pub task_id: String,
	pub role: String,
	pub content: String,
	pub redacted: bool,
}

#[async_trait]
pub trait TranscriptStore: Send + Sync {
	async fn insert_transcript(
		&self,
		agent_id: &str,
		task_id: &str,
		role: &str,
		content: &str,
		redacted: bool,
	) -> Result<TranscriptRecord, DbError>;
	async fn list_unredacted(&self, limit: i64) -> Result<Vec<TranscriptRecord>, DbError>;
}

#[async_trait]
impl TranscriptStore for TranscriptRepository {
	async fn insert_transcript(
		&self,
		agent_id: &str,
		task_id: &str,
		role: &str,
		content: &str,
		redacted: bool,
	) -> Result<TranscriptRecord, DbError> {
		self
			.insert_transcript(agent_id, task_id, role, content, redacted)
			.await
	}

	async fn list_unredacted(&self, limit: i64) -> Result<Vec<TranscriptRecord>, DbError> {
		self.list_unredacted(limit).await
	}
}

#[derive(Clone)]
pub struct TranscriptRepository {
	pool: SqlitePool,
}

impl TranscriptRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, content), fields(content_len = content.len()))]
	pub async fn insert_transcript(
		&self,
		agent_id: &str,
		task_id: &str,
		role: &str,
		content: &str,
		redacted: bool,
	) -> Result<TranscriptRecord, DbError> {
		let id = new_id();
		sqlx::query(
			"INSERT INTO transcripts (id, agent_id, task_id, role, content, redacted) VALUES (?, ?, ?, ?, ?, ?)",
		)
		.bind(&id)
		.bind(agent_id)
		.bind(task_id)
		.bind(role)
		.bind(content)
		.bind(redacted as i64)
		.execute(&self.pool)
		.await?;

		Ok(TranscriptRecord {
			id,
			agent_id: agent_id.to_string(),
			task_id: task_id.to_string(),
			role: role.to_string(),
			content: content.to_string(),
			redacted,
		})
	}

	/// Most recent transcripts that were stored without redaction.
	#[tracing::instrument(skip(self))]
	pub async fn list_unredacted(&self, limit: i64) -> Result<Vec<TranscriptRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, agent_id, task_id, role, content, redacted
			FROM transcripts
			WHERE redacted = 0
			ORDER BY created_at DESC
			LIMIT ?
			"#,
		)
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows
			.iter()
			.map(|row| TranscriptRecord {
				id: row.get("id"),
				agent_id: row.get("agent_id"),
				task_id: row.get("task_id"),
				role: row.get("role"),
				content: row.get("content"),
				redacted: row.get::<i64, _>("redacted") != 0,
			})
			.collect())
	}
}
