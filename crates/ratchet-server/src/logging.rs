// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracing setup with secret redaction on every emitted line.

use std::io::{self, Write};
use std::sync::Arc;

use ratchet_common_config::{LogFormat, LoggingConfig};
use ratchet_server_secrets::SecretGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
/// Output goes to stderr so command output on stdout stays parseable.
pub fn init_tracing(config: &LoggingConfig, guard: Option<Arc<SecretGuard>>) -> Result<(), TryInitError> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
	let writer = RedactingMakeWriter::new(io::stderr, guard);
	let registry = tracing_subscriber::registry().with(filter);

	match config.format {
		LogFormat::Text => registry
			.with(tracing_subscriber::fmt::layer().with_writer(writer))
			.try_init(),
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(writer))
			.try_init(),
	}
}

/// Buffers output per line and replaces known secret values before writing.
pub struct RedactingWriter<W: Write> {
	inner: W,
	guard: Option<Arc<SecretGuard>>,
	buffer: Vec<u8>,
}

impl<W: Write> RedactingWriter<W> {
	pub fn new(inner: W, guard: Option<Arc<SecretGuard>>) -> Self {
		Self {
			inner,
			guard,
			buffer: Vec::new(),
		}
	}

	fn write_redacted(&mut self, bytes: &[u8]) -> io::Result<()> {
		let Some(guard) = &self.guard else {
			return self.inner.write_all(bytes);
		};
		let text = String::from_utf8_lossy(bytes);
		self.inner.write_all(guard.redact(&text).as_bytes())
	}
}

impl<W: Write> Drop for RedactingWriter<W> {
	fn drop(&mut self) {
		let _ = self.flush();
	}
}

impl<W: Write> Write for RedactingWriter<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buffer.extend_from_slice(buf);

		while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
			let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
			self.write_redacted(&line)?;
		}

		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		if !self.buffer.is_empty() {
			let rest = std::mem::take(&mut self.buffer);
			self.write_redacted(&rest)?;
		}
		self.inner.flush()
	}
}

pub struct RedactingMakeWriter<M> {
	inner: M,
	guard: Option<Arc<SecretGuard>>,
}

impl<M> RedactingMakeWriter<M> {
	pub fn new(inner: M, guard: Option<Arc<SecretGuard>>) -> Self {
		Self { inner, guard }
	}
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
	M: MakeWriter<'a>,
{
	type Writer = RedactingWriter<M::Writer>;

	fn make_writer(&'a self) -> Self::Writer {
		RedactingWriter::new(self.inner.make_writer(), self.guard.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ratchet_server_secrets::MemorySecretProvider;

	async fn loaded_guard() -> Arc<SecretGuard> {
		let provider = MemorySecretProvider::with_secrets([("OPENAI_API_KEY", "sk-live-abcdef123456")]);
		let guard = Arc::new(SecretGuard::new(Arc::new(provider)));
		guard.load_all().await.unwrap();
		guard
	}

	#[tokio::test]
	async fn known_secret_is_redacted_across_partial_writes() {
		let guard = loaded_guard().await;
		let mut output = Vec::new();
		{
			let mut writer = RedactingWriter::new(&mut output, Some(guard));
			writer.write_all(b"calling provider key=sk-live-").unwrap();
			writer.write_all(b"abcdef123456 done\nnext line\n").unwrap();
		}
		let result = String::from_utf8(output).unwrap();
		assert_eq!(
			result,
			"calling provider key=[REDACTED:OPENAI_API_KEY] done\nnext line\n"
		);
	}

	#[tokio::test]
	async fn incomplete_line_is_redacted_on_flush() {
		let guard = loaded_guard().await;
		let mut output = Vec::new();
		{
			let mut writer = RedactingWriter::new(&mut output, Some(guard));
			writer.write_all(b"trailing sk-live-abcdef123456").unwrap();
		}
		let result = String::from_utf8(output).unwrap();
		assert!(!result.contains("sk-live-abcdef123456"));
		assert!(result.contains("[REDACTED:OPENAI_API_KEY]"));
	}

	#[test]
	fn passthrough_without_guard() {
		let mut output = Vec::new();
		{
			let mut writer = RedactingWriter::new(&mut output, None);
			writer.write_all(b"plain line\n").unwrap();
		}
		assert_eq!(output, b"plain line\n");
	}
}
