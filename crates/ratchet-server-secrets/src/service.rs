// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The secret mutation path. Every write goes through here so the guard
//! and any dependent caches stay coherent with the store.

use std::sync::Arc;

use parking_lot::RwLock;
use ratchet_common_config::SecretString;

use crate::error::{SecretsError, SecretsResult};
use crate::guard::SecretGuard;
use crate::provider::SecretProvider;

/// Notified after a secret has been set or deleted.
pub trait SecretChangeListener: Send + Sync {
	fn secret_changed(&self, name: &str);
}

pub struct SecretsService {
	provider: Arc<dyn SecretProvider>,
	guard: Arc<SecretGuard>,
	listeners: RwLock<Vec<Arc<dyn SecretChangeListener>>>,
}

impl SecretsService {
	pub fn new(provider: Arc<dyn SecretProvider>) -> Self {
		let guard = Arc::new(SecretGuard::new(Arc::clone(&provider)));
		Self::with_guard(guard)
	}

	pub fn with_guard(guard: Arc<SecretGuard>) -> Self {
		Self {
			provider: guard.provider(),
			guard,
			listeners: RwLock::new(Vec::new()),
		}
	}

	pub fn guard(&self) -> Arc<SecretGuard> {
		Arc::clone(&self.guard)
	}

	pub fn provider(&self) -> Arc<dyn SecretProvider> {
		Arc::clone(&self.provider)
	}

	pub fn subscribe(&self, listener: Arc<dyn SecretChangeListener>) {
		self.listeners.write().push(listener);
	}

	pub async fn get(&self, name: &str) -> SecretsResult<Option<SecretString>> {
		self.provider.get(name).await
	}

	pub async fn list(&self) -> SecretsResult<Vec<String>> {
		self.provider.list().await
	}

	/// Store a secret. On success the guard holds the new value and every
	/// listener has been told about `name`.
	#[tracing::instrument(skip(self, value), fields(provider = %self.provider.name()))]
	pub async fn set(&self, name: &str, value: SecretString) -> SecretsResult<()> {
		validate_name(name)?;
		self.provider.set(name, value).await?;
		self.notify(name);
		self.guard.load(&[name]).await?;
		tracing::info!(%name, "secret set");
		Ok(())
	}

	/// Delete a secret. On success the guard no longer holds it.
	#[tracing::instrument(skip(self), fields(provider = %self.provider.name()))]
	pub async fn delete(&self, name: &str) -> SecretsResult<()> {
		validate_name(name)?;
		self.provider.delete(name).await?;
		self.notify(name);
		self.guard.load_all().await?;
		tracing::info!(%name, "secret deleted");
		Ok(())
	}

	fn notify(&self, name: &str) {
		let listeners = self.listeners.read().clone();
		for listener in listeners {
			listener.secret_changed(name);
		}
	}
}

fn validate_name(name: &str) -> SecretsResult<()> {
	if name.trim().is_empty() {
		return Err(SecretsError::InvalidArgument("secret name is empty".to_string()));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemorySecretProvider;
	use parking_lot::Mutex;

	#[derive(Default)]
	struct Recorder {
		seen: Mutex<Vec<String>>,
	}

	impl SecretChangeListener for Recorder {
		fn secret_changed(&self, name: &str) {
			self.seen.lock().push(name.to_string());
		}
	}

	fn service() -> (SecretsService, Arc<Recorder>) {
		let service = SecretsService::new(Arc::new(MemorySecretProvider::new()));
		let recorder = Arc::new(Recorder::default());
		service.subscribe(recorder.clone());
		(service, recorder)
	}

	#[tokio::test]
	async fn set_refreshes_guard_and_notifies() {
		let (service, recorder) = service();
		service.set("API_KEY", "sk-abcdef".into()).await.unwrap();

		assert_eq!(service.guard().get("API_KEY").unwrap().expose(), "sk-abcdef");
		assert_eq!(*recorder.seen.lock(), vec!["API_KEY".to_string()]);
	}

	#[tokio::test]
	async fn delete_removes_from_guard() {
		let (service, recorder) = service();
		service.set("API_KEY", "sk-abcdef".into()).await.unwrap();
		service.delete("API_KEY").await.unwrap();

		assert!(!service.guard().contains("API_KEY"));
		assert_eq!(recorder.seen.lock().len(), 2);
	}

	#[tokio::test]
	async fn delete_missing_is_not_found_without_notifying() {
		let (service, recorder) = service();
		assert!(matches!(
			service.delete("NOPE").await,
			Err(SecretsError::NotFound(_))
		));
		assert!(recorder.seen.lock().is_empty());
	}

	#[tokio::test]
	async fn empty_name_is_rejected() {
		let (service, _) = service();
		assert!(matches!(
			service.set("", "v".into()).await,
			Err(SecretsError::InvalidArgument(_))
		));
		assert!(service.list().await.unwrap().is_empty());
	}
}
