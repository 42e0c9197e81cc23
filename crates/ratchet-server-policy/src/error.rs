// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ratchet_server_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error("policy not found: {0}")]
	NotFound(String),

	#[error("policy store error: {0}")]
	Store(#[from] DbError),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
