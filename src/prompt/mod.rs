// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! # System-Prompt Resolver
//!
//! Resolves a collection's system prompt from its on-chain URI, lazily on the
//! first settlement for that collection:
//!
//! 1. `systemPromptUri()` view call.
//! 2. HEAD request; an advertised length of 5000 bytes or more short-circuits
//!    to an empty prompt (prompt-injection DoS cap).
//! 3. GET through a bounded reader with the same cap, so a server that lies
//!    in HEAD cannot feed an oversized body either.
//! 4. RSA-OAEP-SHA256 decryption with the enclave keypair; on failure the raw
//!    bytes are used as-is. Submitters who want confidentiality encrypt under
//!    the public key published at `/pubkey`; everyone else posts plaintext.
//! 5. Result cached by collection address (the URI is immutable on-chain).

pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use reqwest::header::CONTENT_LENGTH;
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;

use crate::blockchain::{ChainClient, ChainError};
use cache::PromptCache;

/// Prompts at or above this size are rejected without fetching the body.
pub const MAX_PROMPT_BYTES: usize = 5000;

/// Cached prompts per process.
const CACHE_CAPACITY: usize = 1000;

/// How long a resolved prompt stays fresh.
const CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Prompt fetch failed: {0}")]
    Http(String),
}

/// Resolver for per-collection system prompts.
pub struct PromptResolver {
    chain: Arc<dyn ChainClient>,
    http: reqwest::Client,
    decryption_key: RsaPrivateKey,
    cache: PromptCache,
}

impl PromptResolver {
    pub fn new(chain: Arc<dyn ChainClient>, decryption_key: RsaPrivateKey) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            chain,
            http,
            decryption_key,
            cache: PromptCache::new(CACHE_CAPACITY, CACHE_TTL),
        }
    }

    /// Resolve the system prompt for a collection, consulting the cache
    /// first. Size-capped failures resolve to the empty string rather than an
    /// error: the auction still settles, just without steering.
    pub async fn resolve(&self, collection: Address) -> Result<String, PromptError> {
        if let Some(prompt) = self.cache.get(collection) {
            return Ok(prompt);
        }

        let uri = self.chain.system_prompt_uri(collection).await?;
        let prompt = self.fetch_prompt(&uri).await?;

        self.cache.put(collection, prompt.clone());
        Ok(prompt)
    }

    /// Fetch and decode the prompt body behind a URI.
    async fn fetch_prompt(&self, uri: &str) -> Result<String, PromptError> {
        let head = self
            .http
            .head(uri)
            .send()
            .await
            .map_err(|e| PromptError::Http(e.to_string()))?;

        let advertised = head
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<usize>().ok());

        if let Some(length) = advertised {
            if length >= MAX_PROMPT_BYTES {
                tracing::warn!(uri, length, "system prompt exceeds size cap, using empty prompt");
                return Ok(String::new());
            }
        }

        let mut response = self
            .http
            .get(uri)
            .send()
            .await
            .map_err(|e| PromptError::Http(e.to_string()))?;

        // Bounded reader: HEAD is advisory, the cap is enforced here.
        let mut body: Vec<u8> = Vec::new();
        loop {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| PromptError::Http(e.to_string()))?;
            let Some(chunk) = chunk else { break };

            if body.len() + chunk.len() >= MAX_PROMPT_BYTES {
                tracing::warn!(uri, "system prompt body exceeds size cap, using empty prompt");
                return Ok(String::new());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(self.decode_prompt(&body))
    }

    /// Try enclave decryption; fall back to the raw bytes. The fallback keeps
    /// plaintext submissions working, at the cost of a corrupted ciphertext
    /// becoming a literal prompt.
    fn decode_prompt(&self, body: &[u8]) -> String {
        match self.decryption_key.decrypt(Oaep::new::<Sha256>(), body) {
            Ok(plain) => String::from_utf8_lossy(&plain).into_owned(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to decrypt system prompt, using raw bytes");
                String::from_utf8_lossy(body).into_owned()
            }
        }
    }
}
