// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! dstack tappd client: enclave key derivation and TDX attestation quotes.
//!
//! The agent talks to the tappd service over its `prpc` HTTP surface for two
//! operations only: deriving the sealing key for the setup record, and
//! producing a remote attestation quote that binds the wallet address and the
//! factory address into the report data.

use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

/// Errors from the tappd service.
#[derive(Debug, thiserror::Error)]
pub enum TeeError {
    #[error("tappd request failed: {0}")]
    Request(String),

    #[error("tappd response was invalid: {0}")]
    InvalidResponse(String),

    #[error("key derivation failed: {0}")]
    DeriveFailed(String),
}

/// Narrow interface to the enclave attestation service.
#[async_trait]
pub trait TeeClient: Send + Sync {
    /// Derive a 32-byte symmetric key bound to the enclave identity and the
    /// given path/subject pair. Deterministic across restarts for the same
    /// enclave identity.
    async fn derive_key(&self, path: &str, subject: &str) -> Result<[u8; 32], TeeError>;

    /// Request a TDX quote over the given report data.
    async fn tdx_quote(&self, report_data: &[u8]) -> Result<String, TeeError>;
}

/// Production tappd client speaking the `prpc` JSON surface.
#[derive(Debug, Clone)]
pub struct DstackClient {
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DeriveKeyResponse {
    key: String,
}

#[derive(Debug, Deserialize)]
struct TdxQuoteResponse {
    quote: String,
}

impl DstackClient {
    pub fn new(endpoint: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn rpc_url(&self, method: &str) -> String {
        format!("{}/prpc/Tappd.{}?json", self.endpoint, method)
    }
}

#[async_trait]
impl TeeClient for DstackClient {
    async fn derive_key(&self, path: &str, subject: &str) -> Result<[u8; 32], TeeError> {
        let response = self
            .http
            .post(self.rpc_url("DeriveKey"))
            .json(&json!({ "path": path, "subject": subject }))
            .send()
            .await
            .map_err(|e| TeeError::DeriveFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TeeError::DeriveFailed(format!(
                "status {}",
                response.status()
            )));
        }

        let body: DeriveKeyResponse = response
            .json()
            .await
            .map_err(|e| TeeError::InvalidResponse(e.to_string()))?;

        // tappd returns PEM key material; reduce it to exactly the 32 bytes
        // the sealing cipher needs. Stable for a given enclave identity.
        Ok(Sha256::digest(body.key.as_bytes()).into())
    }

    async fn tdx_quote(&self, report_data: &[u8]) -> Result<String, TeeError> {
        let response = self
            .http
            .post(self.rpc_url("TdxQuote"))
            .json(&json!({ "report_data": alloy::hex::encode(report_data) }))
            .send()
            .await
            .map_err(|e| TeeError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TeeError::Request(format!("status {}", response.status())));
        }

        let body: TdxQuoteResponse = response
            .json()
            .await
            .map_err(|e| TeeError::InvalidResponse(e.to_string()))?;

        Ok(body.quote)
    }
}

/// Report data bound into the attestation quote: the agent's wallet address
/// concatenated with the factory address, big-endian, 40 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportData {
    pub address: Address,
    pub factory_address: Address,
}

impl ReportData {
    pub fn new(address: Address, factory_address: Address) -> Self {
        Self {
            address,
            factory_address,
        }
    }

    pub fn to_bytes(&self) -> [u8; 40] {
        let mut out = [0u8; 40];
        out[..20].copy_from_slice(self.address.as_slice());
        out[20..].copy_from_slice(self.factory_address.as_slice());
        out
    }
}
