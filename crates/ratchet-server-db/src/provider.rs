// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! LLM provider repository.
//!
//! Each row binds a caller-visible alias to a provider type, model and the
//! name of the secret holding its credentials. At most one row is the
//! default.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::{conflict_on_unique, DbError};
use crate::types::{new_id, parse_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmProviderRecord {
	pub id: String,
	pub alias: String,
	pub provider_type: String,
	pub model: String,
	pub secret_name: String,
	pub base_url: String,
	pub max_tokens: i64,
	pub is_default: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLlmProvider {
	pub alias: String,
	pub provider_type: String,
	pub model: String,
	pub secret_name: String,
	pub base_url: String,
	pub max_tokens: i64,
	pub is_default: bool,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmProviderUpdate {
	pub provider_type: Option<String>,
	pub model: Option<String>,
	pub secret_name: Option<String>,
	pub base_url: Option<String>,
	pub max_tokens: Option<i64>,
}

#[async_trait]
pub trait LlmProviderStore: Send + Sync {
	async fn get_provider_by_alias(&self, alias: &str) -> Result<Option<LlmProviderRecord>, DbError>;
	async fn get_default_provider(&self) -> Result<Option<LlmProviderRecord>, DbError>;
	async fn list_providers(&self) -> Result<Vec<LlmProviderRecord>, DbError>;
	async fn create_provider(&self, provider: &NewLlmProvider) -> Result<LlmProviderRecord, DbError>;
	async fn update_provider(
		&self,
		alias: &str,
		update: &LlmProviderUpdate,
	) -> Result<LlmProviderRecord, DbError>;
	async fn delete_provider(&self, alias: &str) -> Result<bool, DbError>;
	async fn set_default_provider(&self, alias: &str) -> Result<(), DbError>;
}

#[async_trait]
impl LlmProviderStore for LlmProviderRepository {
	async fn get_provider_by_alias(&self, alias: &str) -> Result<Option<LlmProviderRecord>, DbError> {
		self.get_provider_by_alias(alias).await
	}

	async fn get_default_provider(&self) -> Result<Option<LlmProviderRecord>, DbError> {
		self.get_default_provider().await
	}

	async fn list_providers(&self) -> Result<Vec<LlmProviderRecord>, DbError> {
		self.list_providers().await
	}

	async fn create_provider(&self, provider: &NewLlmProvider) -> Result<LlmProviderRecord, DbError> {
		self.create_provider(provider).await
	}

	async fn update_provider(
		&self,
		alias: &str,
		update: &LlmProviderUpdate,
	) -> Result<LlmProviderRecord, DbError> {
		self.update_provider(alias, update).await
	}

	async fn delete_provider(&self, alias: &str) -> Result<bool, DbError> {
		self.delete_provider(alias).await
	}

	async fn set_default_provider(&self, alias: &str) -> Result<(), DbError> {
		self.set_default_provider(alias).await
	}
}

const SELECT_COLUMNS: &str = "SELECT id, alias, type, model, secret_name, base_url, max_tokens, is_default, created_at, updated_at FROM llm_providers";

#[derive(Clone)]
pub struct LlmProviderRepository {
	pool: SqlitePool,
}

impl LlmProviderRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_provider_by_alias(&self, alias: &str) -> Result<Option<LlmProviderRecord>, DbError> {
		let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE alias = ?"))
			.bind(alias)
			.fetch_optional(&self.pool)
			.await?;

		row.as_ref().map(row_to_provider).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_default_provider(&self) -> Result<Option<LlmProviderRecord>, DbError> {
		let row = sqlx::query(&format!(
			"{SELECT_COLUMNS} WHERE is_default = 1 ORDER BY updated_at DESC LIMIT 1"
		))
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_provider).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_providers(&self) -> Result<Vec<LlmProviderRecord>, DbError> {
		let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY alias"))
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(row_to_provider).collect()
	}

	/// Insert a provider. When `is_default` is set the previous default is
	/// cleared in the same transaction.
	#[tracing::instrument(skip(self, provider), fields(alias = %provider.alias, provider_type = %provider.provider_type))]
	pub async fn create_provider(&self, provider: &NewLlmProvider) -> Result<LlmProviderRecord, DbError> {
		let id = new_id();
		let now = Utc::now();
		let mut tx = self.pool.begin().await?;

		if provider.is_default {
			sqlx::query("UPDATE llm_providers SET is_default = 0 WHERE is_default = 1")
				.execute(&mut *tx)
				.await?;
		}

		sqlx::query(
			r#"
			INSERT INTO llm_providers (
				id, alias, type, model, secret_name, base_url, max_tokens, is_default, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&id)
		.bind(&provider.alias)
		.bind(&provider.provider_type)
		.bind(&provider.model)
		.bind(&provider.secret_name)
		.bind(&provider.base_url)
		.bind(provider.max_tokens)
		.bind(provider.is_default as i64)
		.bind(now.to_rfc3339())
		.bind(now.to_rfc3339())
		.execute(&mut *tx)
		.await
		.map_err(conflict_on_unique("Provider alias"))?;

		tx.commit().await?;
		tracing::debug!(provider_id = %id, "provider created");

		Ok(LlmProviderRecord {
			id,
			alias: provider.alias.clone(),
			provider_type: provider.provider_type.clone(),
			model: provider.model.clone(),
			secret_name: provider.secret_name.clone(),
			base_url: provider.base_url.clone(),
			max_tokens: provider.max_tokens,
			is_default: provider.is_default,
			created_at: now,
			updated_at: now,
		})
	}

	#[tracing::instrument(skip(self, update))]
	pub async fn update_provider(
		&self,
		alias: &str,
		update: &LlmProviderUpdate,
	) -> Result<LlmProviderRecord, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE llm_providers SET
				type = COALESCE(?, type),
				model = COALESCE(?, model),
				secret_name = COALESCE(?, secret_name),
				base_url = COALESCE(?, base_url),
				max_tokens = COALESCE(?, max_tokens),
				updated_at = ?
			WHERE alias = ?
			"#,
		)
		.bind(update.provider_type.as_deref())
		.bind(update.model.as_deref())
		.bind(update.secret_name.as_deref())
		.bind(update.base_url.as_deref())
		.bind(update.max_tokens)
		.bind(Utc::now().to_rfc3339())
		.bind(alias)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("provider '{alias}'")));
		}

		self
			.get_provider_by_alias(alias)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("provider '{alias}'")))
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_provider(&self, alias: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM llm_providers WHERE alias = ?")
			.bind(alias)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Make `alias` the only default provider. Clearing the old default and
	/// setting the new one happen in one transaction.
	#[tracing::instrument(skip(self))]
	pub async fn set_default_provider(&self, alias: &str) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		sqlx::query("UPDATE llm_providers SET is_default = 0 WHERE is_default = 1")
			.execute(&mut *tx)
			.await?;

		let result = sqlx::query("UPDATE llm_providers SET is_default = 1, updated_at = ? WHERE alias = ?")
			.bind(Utc::now().to_rfc3339())
			.bind(alias)
			.execute(&mut *tx)
			.await?;

		if result.rows_affected() == 0 {
			tx.rollback().await?;
			return Err(DbError::NotFound(format!("provider '{alias}'")));
		}

		tx.commit().await?;
		tracing::info!(%alias, "default provider changed");
		Ok(())
	}
}

fn row_to_provider(row: &sqlx::sqlite::SqliteRow) -> Result<LlmProviderRecord, DbError> {
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(LlmProviderRecord {
		id: row.get("id"),
		alias: row.get("alias"),
		provider_type: row.get("type"),
		model: row.get("model"),
		secret_name: row.get("secret_name"),
		base_url: row.get("base_url"),
		max_tokens: row.get("max_tokens"),
		is_default: row.get::<i64, _>("is_default") != 0,
		created_at: parse_timestamp(&created_at)?,
		updated_at: parse_timestamp(&updated_at)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn make_repo() -> LlmProviderRepository {
		let pool = crate::testing::create_test_pool().await.unwrap();
		LlmProviderRepository::new(pool)
	}

	fn mock(alias: &str, is_default: bool) -> NewLlmProvider {
		NewLlmProvider {
			alias: alias.to_string(),
			provider_type: "mock".to_string(),
			model: "mock-1".to_string(),
			is_default,
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_create_and_get_provider() {
		let repo = make_repo().await;
		let created = repo.create_provider(&mock("local", false)).await.unwrap();

		let fetched = repo.get_provider_by_alias("local").await.unwrap().unwrap();
		assert_eq!(fetched.id, created.id);
		assert_eq!(fetched.provider_type, "mock");
		assert!(!fetched.is_default);
		assert!(repo.get_provider_by_alias("missing").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_duplicate_alias_conflicts() {
		let repo = make_repo().await;
		repo.create_provider(&mock("dup", false)).await.unwrap();
		let err = repo.create_provider(&mock("dup", false)).await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn test_raw_insert_uses_column_defaults() {
		let repo = make_repo().await;
		sqlx::query("INSERT INTO llm_providers (id, alias, type) VALUES ('p1', 'test-mock', 'mock')")
			.execute(&repo.pool)
			.await
			.unwrap();

		let fetched = repo.get_provider_by_alias("test-mock").await.unwrap().unwrap();
		assert_eq!(fetched.id, "p1");
		assert_eq!(fetched.secret_name, "");
		assert_eq!(fetched.max_tokens, 0);
	}

	#[tokio::test]
	async fn test_set_default_is_exclusive() {
		let repo = make_repo().await;
		repo.create_provider(&mock("a", true)).await.unwrap();
		repo.create_provider(&mock("b", false)).await.unwrap();

		assert_eq!(repo.get_default_provider().await.unwrap().unwrap().alias, "a");

		repo.set_default_provider("b").await.unwrap();
		let providers = repo.list_providers().await.unwrap();
		let defaults: Vec<_> = providers.iter().filter(|p| p.is_default).collect();
		assert_eq!(defaults.len(), 1);
		assert_eq!(defaults[0].alias, "b");
	}

	#[tokio::test]
	async fn test_set_default_missing_keeps_previous() {
		let repo = make_repo().await;
		repo.create_provider(&mock("a", true)).await.unwrap();

		let err = repo.set_default_provider("nope").await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
		assert_eq!(repo.get_default_provider().await.unwrap().unwrap().alias, "a");
	}

	#[tokio::test]
	async fn test_create_default_clears_previous() {
		let repo = make_repo().await;
		repo.create_provider(&mock("a", true)).await.unwrap();
		repo.create_provider(&mock("b", true)).await.unwrap();

		let a = repo.get_provider_by_alias("a").await.unwrap().unwrap();
		assert!(!a.is_default);
		assert_eq!(repo.get_default_provider().await.unwrap().unwrap().alias, "b");
	}

	#[tokio::test]
	async fn test_update_and_delete() {
		let repo = make_repo().await;
		repo.create_provider(&mock("a", false)).await.unwrap();

		let updated = repo
			.update_provider(
				"a",
				&LlmProviderUpdate {
					model: Some("mock-2".to_string()),
					secret_name: Some("MOCK_KEY".to_string()),
					..Default::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(updated.model, "mock-2");
		assert_eq!(updated.secret_name, "MOCK_KEY");
		assert_eq!(updated.provider_type, "mock");

		let err = repo
			.update_provider("missing", &LlmProviderUpdate::default())
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));

		assert!(repo.delete_provider("a").await.unwrap());
		assert!(!repo.delete_provider("a").await.unwrap());
	}
}
