// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token encryption at rest.
//!
//! Tokens are sealed with AES-256-GCM under a key derived from the
//! machine-local key material and the data directory, and stored as
//! `enc:` + base64(nonce || ciphertext || tag).

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Marker on stored values that are encrypted.
pub const ENC_PREFIX: &str = "enc:";

/// Generate random key material.
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	OsRng.fill_bytes(key.as_mut());
	key
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

/// Derive the data key as `SHA-256(material || data_dir)`.
///
/// Binding the directory means the same token saved under two data
/// directories never produces comparable ciphertexts.
pub fn derive_key(material: &[u8; KEY_SIZE], data_dir: &Path) -> Zeroizing<[u8; KEY_SIZE]> {
	let mut hasher = Sha256::new();
	hasher.update(material);
	hasher.update(data_dir.to_string_lossy().as_bytes());
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	key.copy_from_slice(&hasher.finalize());
	key
}

pub fn is_encrypted(value: &str) -> bool {
	value.starts_with(ENC_PREFIX)
}

/// Encrypt a token. Empty tokens are returned verbatim.
pub fn encrypt_token(key: &[u8; KEY_SIZE], plaintext: &str) -> SecretsResult<String> {
	if plaintext.is_empty() {
		return Ok(String::new());
	}

	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
	let nonce_bytes = generate_nonce();
	let ciphertext = cipher
		.encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
		.map_err(|e| SecretsError::Encryption(format!("token encryption failed: {e}")))?;

	let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
	sealed.extend_from_slice(&nonce_bytes);
	sealed.extend_from_slice(&ciphertext);

	Ok(format!("{ENC_PREFIX}{}", STANDARD.encode(sealed)))
}

/// Decrypt a stored token. Values without the `enc:` prefix are returned
/// unchanged.
pub fn decrypt_token(key: &[u8; KEY_SIZE], stored: &str) -> SecretsResult<Zeroizing<String>> {
	let Some(encoded) = stored.strip_prefix(ENC_PREFIX) else {
		return Ok(Zeroizing::new(stored.to_string()));
	};

	let sealed = STANDARD
		.decode(encoded)
		.map_err(|e| SecretsError::Decryption(format!("invalid base64: {e}")))?;

	if sealed.len() < NONCE_SIZE {
		return Err(SecretsError::Decryption(
			"ciphertext shorter than nonce".to_string(),
		));
	}

	let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
	let plaintext = Zeroizing::new(
		cipher
			.decrypt(Nonce::from_slice(nonce), ciphertext)
			.map_err(|e| SecretsError::Decryption(format!("token decryption failed: {e}")))?,
	);

	let text = std::str::from_utf8(&plaintext)
		.map_err(|e| SecretsError::Decryption(format!("token is not UTF-8: {e}")))?;
	Ok(Zeroizing::new(text.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::path::PathBuf;

	fn key_for(dir: &str) -> Zeroizing<[u8; KEY_SIZE]> {
		let material = [7u8; KEY_SIZE];
		derive_key(&material, &PathBuf::from(dir))
	}

	#[test]
	fn key_generation_produces_unique_keys() {
		let key1 = generate_key();
		let key2 = generate_key();
		assert_ne!(key1.as_slice(), key2.as_slice());
	}

	#[test]
	fn derived_key_depends_on_directory() {
		assert_ne!(key_for("/a").as_slice(), key_for("/b").as_slice());
		assert_eq!(key_for("/a").as_slice(), key_for("/a").as_slice());
	}

	#[test]
	fn token_roundtrip() {
		let key = key_for("/data");
		let sealed = encrypt_token(&key, "s.mytoken").unwrap();
		assert!(sealed.starts_with(ENC_PREFIX));
		assert!(!sealed.contains("s.mytoken"));
		assert_eq!(decrypt_token(&key, &sealed).unwrap().as_str(), "s.mytoken");
	}

	#[test]
	fn sealed_layout_is_nonce_ciphertext_tag() {
		let key = key_for("/data");
		let sealed = encrypt_token(&key, "abc").unwrap();
		let raw = STANDARD.decode(&sealed[ENC_PREFIX.len()..]).unwrap();
		assert_eq!(raw.len(), NONCE_SIZE + 3 + TAG_SIZE);
	}

	#[test]
	fn empty_token_is_not_encrypted() {
		let key = key_for("/data");
		assert_eq!(encrypt_token(&key, "").unwrap(), "");
	}

	#[test]
	fn plain_value_passes_through() {
		let key = key_for("/data");
		assert_eq!(decrypt_token(&key, "legacy").unwrap().as_str(), "legacy");
	}

	#[test]
	fn corrupt_values_fail() {
		let key = key_for("/data");
		assert!(matches!(
			decrypt_token(&key, "enc:!!!not-base64"),
			Err(SecretsError::Decryption(_))
		));
		assert!(matches!(
			decrypt_token(&key, &format!("enc:{}", STANDARD.encode([1u8; 4]))),
			Err(SecretsError::Decryption(_))
		));

		let sealed = encrypt_token(&key, "token").unwrap();
		let other = key_for("/elsewhere");
		assert!(matches!(
			decrypt_token(&other, &sealed),
			Err(SecretsError::Decryption(_))
		));
	}

	proptest! {
		#[test]
		fn prop_roundtrip(token in ".{1,200}", dir in "/[a-z]{1,20}") {
			let key = key_for(&dir);
			let sealed = encrypt_token(&key, &token).unwrap();
			let decrypted = decrypt_token(&key, &sealed).unwrap();
			prop_assert_eq!(decrypted.as_str(), token.as_str());
		}

		#[test]
		fn prop_distinct_dirs_produce_distinct_ciphertexts(token in "[a-zA-Z0-9.]{1,64}") {
			let a = encrypt_token(&key_for("/a"), &token).unwrap();
			let b = encrypt_token(&key_for("/b"), &token).unwrap();
			prop_assert_ne!(a, b);
		}

		#[test]
		fn prop_tampered_token_fails(
			token in "[a-zA-Z0-9]{1,64}",
			idx in any::<usize>(),
		) {
			let key = key_for("/data");
			let sealed = encrypt_token(&key, &token).unwrap();
			let mut raw = STANDARD.decode(&sealed[ENC_PREFIX.len()..]).unwrap();
			let i = idx % raw.len();
			raw[i] ^= 0xFF;
			let tampered = format!("{ENC_PREFIX}{}", STANDARD.encode(raw));
			prop_assert!(decrypt_token(&key, &tampered).is_err());
		}
	}
}
