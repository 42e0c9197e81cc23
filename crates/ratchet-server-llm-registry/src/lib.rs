// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! LLM provider registry for Ratchet.
//!
//! Provider rows live in the database; credentials live in the secret store.
//! [`ProviderRegistry`] joins the two into ready-to-use clients and keeps
//! them cached per alias until a row or a referenced secret changes.

pub mod client;
pub mod error;
pub mod factory;
pub mod registry;
pub mod types;

pub use client::{new_http_client, user_agent, HttpProviderClient, MockProviderClient, ProviderClient};
pub use error::{LlmRegistryError, LlmRegistryResult};
pub use factory::{ClientFactory, DefaultClientFactory};
pub use registry::ProviderRegistry;
pub use types::{ConnectionTestResult, ProviderSpec, ProviderType};
