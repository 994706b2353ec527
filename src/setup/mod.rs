// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! # Sealed Keystore Bootstrap
//!
//! On first boot the agent draws its long-lived key material (a 32-byte
//! signing seed and a 2048-bit RSA decryption keypair) and seals it together
//! with the service configuration into a single blob bound to the enclave
//! identity. On every later boot the blob is unsealed and becomes
//! authoritative over the environment.
//!
//! Load failures fall back to regenerating a fresh record. That keeps the
//! agent bootable, but it means existing sealed data is destroyed if the
//! enclave identity changes: the old wallet and decryption key are
//! unrecoverable by design.

pub mod sealing;

use alloy::primitives::{Address, B256};
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

use crate::config::{debug_show_setup, SetupConfig};
use crate::tee::TeeClient;
use sealing::SealingError;

const RSA_KEY_BITS: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("sealing error: {0}")]
    Sealing(#[from] SealingError),

    #[error("setup record is not valid JSON: {0}")]
    Decode(String),

    #[error("setup record could not be serialized: {0}")]
    Encode(String),

    #[error("key generation failed: {0}")]
    KeyGen(String),

    #[error("stored RSA key is invalid: {0}")]
    Key(String),
}

/// The sealed setup record: everything the agent needs beyond the enclave
/// endpoint and the blob path themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetupRecord {
    pub ethereum_rpc_url: String,
    pub factory_address: Address,
    /// Seed of the mint-authorization key; the signing scalar is its
    /// keccak-256.
    pub private_key_seed: B256,
    /// 2048-bit prompt-decryption keypair, PKCS#8 PEM.
    pub rsa_private_key_pem: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub pinata_jwt: String,
    pub api_bind_addr: String,
}

impl SetupRecord {
    pub fn rsa_private_key(&self) -> Result<RsaPrivateKey, SetupError> {
        RsaPrivateKey::from_pkcs8_pem(&self.rsa_private_key_pem)
            .map_err(|e| SetupError::Key(e.to_string()))
    }
}

/// Load the sealed setup record, regenerating it when the load fails.
///
/// Fatal only when regeneration itself fails (key generation, derivation
/// service unreachable, or the blob cannot be written).
pub async fn load_or_generate(
    config: &SetupConfig,
    tee: &dyn TeeClient,
) -> Result<SetupRecord, SetupError> {
    let record = match load(config, tee).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load sealed setup, initializing new setup");
            initialize(config, tee).await?
        }
    };

    if debug_show_setup() {
        tracing::info!(record = ?record, "setup record (debug mode)");
    }

    Ok(record)
}

async fn load(config: &SetupConfig, tee: &dyn TeeClient) -> Result<SetupRecord, SetupError> {
    let data = sealing::read_sealed_file(tee, &config.sealed_setup_file).await?;
    let record = serde_json::from_slice(&data).map_err(|e| SetupError::Decode(e.to_string()))?;

    tracing::info!("loaded sealed setup record");
    Ok(record)
}

async fn initialize(config: &SetupConfig, tee: &dyn TeeClient) -> Result<SetupRecord, SetupError> {
    let record = generate(config)?;

    let data = serde_json::to_vec(&record).map_err(|e| SetupError::Encode(e.to_string()))?;
    sealing::write_sealed_file(tee, &config.sealed_setup_file, &data).await?;

    tracing::info!("wrote sealed setup record");
    Ok(record)
}

/// Draw fresh key material and carry the bootstrap configuration into the
/// record.
fn generate(config: &SetupConfig) -> Result<SetupRecord, SetupError> {
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);

    let rsa_key = RsaPrivateKey::new(&mut rand::rngs::OsRng, RSA_KEY_BITS)
        .map_err(|e| SetupError::KeyGen(e.to_string()))?;
    let rsa_pem = rsa_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| SetupError::KeyGen(e.to_string()))?
        .to_string();

    Ok(SetupRecord {
        ethereum_rpc_url: config.ethereum_rpc_url.clone(),
        factory_address: config.factory_address,
        private_key_seed: B256::from(seed),
        rsa_private_key_pem: rsa_pem,
        openai_api_key: config.openai_api_key.clone(),
        openai_model: config.openai_model.clone(),
        pinata_jwt: config.pinata_jwt.clone(),
        api_bind_addr: config.api_bind_addr.clone(),
    })
}
