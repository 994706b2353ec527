// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Enclave wallet: deterministic signing identity and mint authorizations.
//!
//! The private scalar is `keccak256(seed)` where the seed is the 32 random
//! bytes generated at first boot and kept inside the sealed setup record. The
//! key material never leaves the process and is never logged.

use alloy::primitives::{keccak256, Address};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy::sol_types::Eip712Domain;
use tokio::sync::{Mutex, MutexGuard};

use super::contracts::Mint;

/// Errors raised by wallet construction or signing.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Derive the agent's signer from the sealed seed.
pub fn signer_from_seed(seed: &[u8]) -> Result<PrivateKeySigner, WalletError> {
    let scalar = keccak256(seed);
    PrivateKeySigner::from_slice(scalar.as_slice())
        .map_err(|e| WalletError::InvalidSeed(e.to_string()))
}

/// Deterministic wallet holding the mint-authorization key.
///
/// The wallet also owns the transaction-submission mutex: the agent holds a
/// single nonce source, so exactly one transaction may be in flight at any
/// instant. Keeping the lock here prevents callers from bypassing it.
pub struct Wallet {
    signer: PrivateKeySigner,
    address: Address,
    chain_id: u64,
    submit_lock: Mutex<()>,
}

impl Wallet {
    pub fn from_seed(seed: &[u8], chain_id: u64) -> Result<Self, WalletError> {
        let signer = signer_from_seed(seed)?;
        let address = signer.address();

        tracing::info!(address = %address, chain_id, "wallet initialized");

        Ok(Self {
            signer,
            address,
            chain_id,
            submit_lock: Mutex::new(()),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign the mint authorization `Mint(address to,string uri)` under the
    /// collection's EIP-712 domain. Returns the canonical 65-byte `r‖s‖v`
    /// signature the contract's `ecrecover` expects.
    pub fn sign_mint(
        &self,
        to: Address,
        uri: &str,
        domain: &Eip712Domain,
    ) -> Result<[u8; 65], WalletError> {
        let message = Mint {
            to,
            uri: uri.to_string(),
        };

        let signature = self
            .signer
            .sign_typed_data_sync(&message, domain)
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        Ok(signature.as_bytes())
    }

    /// Acquire the transaction-submission lock. Hold the guard only across
    /// the single submit call.
    pub async fn lock_submission(&self) -> MutexGuard<'_, ()> {
        self.submit_lock.lock().await
    }
}
