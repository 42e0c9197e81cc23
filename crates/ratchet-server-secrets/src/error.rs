// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretsError {
	#[error("secret not found: {0}")]
	NotFound(String),

	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("decryption failed: {0}")]
	Decryption(String),

	#[error("key file error: {0}")]
	KeyFile(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("secret provider '{provider}' failed: {message}")]
	Provider { provider: String, message: String },
}

impl SecretsError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, SecretsError::NotFound(_))
	}

	/// Short machine-readable kind, used in log fields and CLI output.
	pub fn kind(&self) -> &'static str {
		match self {
			SecretsError::NotFound(_) => "not-found",
			SecretsError::InvalidArgument(_) => "invalid-argument",
			SecretsError::Encryption(_) | SecretsError::Decryption(_) | SecretsError::KeyFile(_) => {
				"crypto-failure"
			}
			SecretsError::Io(_) | SecretsError::Serialization(_) | SecretsError::Provider { .. } => {
				"store-failure"
			}
		}
	}
}

pub type SecretsResult<T> = Result<T, SecretsError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kinds() {
		assert!(SecretsError::NotFound("x".into()).is_not_found());
		assert_eq!(SecretsError::Decryption("bad tag".into()).kind(), "crypto-failure");
		assert_eq!(SecretsError::InvalidArgument("empty".into()).kind(), "invalid-argument");
		assert!(!SecretsError::KeyFile("short".into()).is_not_found());
	}
}
