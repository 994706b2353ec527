// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Sealing of the setup record to the enclave identity.
//!
//! The 32-byte sealing key comes from the tappd derivation service under a
//! fixed path/subject pair, so only the same enclave identity can reproduce
//! it. On-disk layout: `nonce(12) ‖ AES-256-GCM ciphertext`. Writes go
//! through a temp file + rename and the file is restricted to the owner.
//!
//! In debug builds the `DEBUG_PLAIN_SETUP` flag bypasses encryption and
//! writes the raw record instead; the flag is compiled out of release
//! artefacts.

use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use crate::config::debug_plain_setup;
use crate::tee::{TeeClient, TeeError};

/// Fixed derivation path/subject: changing either changes the sealing key.
pub const SEALING_KEY_PATH: &str = "/agent/sealing";
pub const SEALING_KEY_SUBJECT: &str = "atelier";

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum SealingError {
    #[error("failed to derive sealing key: {0}")]
    DeriveFailed(#[source] TeeError),

    #[error("sealed file is corrupt: {0}")]
    Corrupt(String),

    #[error("sealing cipher failure: {0}")]
    Cipher(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Seal `data` to the enclave identity and write it atomically.
pub async fn write_sealed_file(
    tee: &dyn TeeClient,
    path: &Path,
    data: &[u8],
) -> Result<(), SealingError> {
    if debug_plain_setup() {
        tracing::warn!("writing setup record WITHOUT sealing (debug mode)");
        return write_atomic(path, data);
    }

    let key = derive_sealing_key(tee).await?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| SealingError::Cipher(e.to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), data)
        .map_err(|e| SealingError::Cipher(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    write_atomic(path, &blob)
}

/// Read and unseal the record at `path`.
pub async fn read_sealed_file(tee: &dyn TeeClient, path: &Path) -> Result<Vec<u8>, SealingError> {
    if debug_plain_setup() {
        return Ok(fs::read(path)?);
    }

    let key = derive_sealing_key(tee).await?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| SealingError::Cipher(e.to_string()))?;

    let blob = fs::read(path)?;
    if blob.len() < NONCE_LEN {
        return Err(SealingError::Corrupt("file shorter than nonce".to_string()));
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SealingError::Corrupt("authentication failed".to_string()))
}

async fn derive_sealing_key(tee: &dyn TeeClient) -> Result<[u8; 32], SealingError> {
    tee.derive_key(SEALING_KEY_PATH, SEALING_KEY_SUBJECT)
        .await
        .map_err(SealingError::DeriveFailed)
}

/// Write via temp file + rename so a crash never leaves a half-written blob.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), SealingError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
