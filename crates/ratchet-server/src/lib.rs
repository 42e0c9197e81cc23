// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ratchet: secrets, provider selection, tool policy, webhook intake, and a
//! security self-audit for agent hosts.

pub mod app;
pub mod error;
pub mod logging;
pub mod webhook;

pub use app::RatchetCore;
pub use error::{CoreError, CoreResult, WebhookError, WebhookResult};
pub use logging::{init_tracing, RedactingMakeWriter, RedactingWriter};
pub use webhook::{WebhookOutcome, WebhookReceiver};
