// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Shared fakes for the integration tests: an in-process chain simulator, a
//! manually driven clock, and recording doubles for the external services.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use atelier_agent::art::{ArtError, ImageGenerator};
use atelier_agent::blockchain::contracts::{IAuctionCollection, IAuctionFactory};
use atelier_agent::blockchain::{
    AuctionState, ChainClient, ChainError, CollectionDomain, CollectionMetadata,
};
use atelier_agent::clock::Clock;
use atelier_agent::pinning::{Pinner, PinningError};
use atelier_agent::tee::{TeeClient, TeeError};

// =============================================================================
// Simulated chain
// =============================================================================

/// A settlement submission recorded by the simulator.
#[derive(Debug, Clone)]
pub struct Submission {
    pub collection: Address,
    pub auction_id: u64,
    pub uri: String,
    pub signature: Vec<u8>,
}

/// Per-collection contract state.
#[derive(Debug, Clone)]
pub struct SimCollection {
    pub metadata: CollectionMetadata,
    pub system_prompt_uri: String,
    pub domain: CollectionDomain,
    pub auctions: HashMap<u64, AuctionState>,
}

struct SimInner {
    head: u64,
    chain_id: u64,
    logs: Vec<Log>,
    collections: HashMap<Address, SimCollection>,
    submissions: Vec<Submission>,
}

/// In-process chain double implementing the agent's chain interface.
pub struct SimulatedChain {
    factory: Address,
    inner: Mutex<SimInner>,
}

impl SimulatedChain {
    pub fn new(factory: Address) -> Self {
        Self {
            factory,
            inner: Mutex::new(SimInner {
                head: 0,
                chain_id: 31337,
                logs: Vec::new(),
                collections: HashMap::new(),
                submissions: Vec::new(),
            }),
        }
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn set_head(&self, head: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.head = inner.head.max(head);
    }

    /// Deploy a collection: stores its state and emits `CollectionCreated`
    /// from the factory at `block`.
    pub fn add_collection(
        &self,
        collection: Address,
        owner: Address,
        block: u64,
        state: SimCollection,
    ) {
        let event = IAuctionFactory::CollectionCreated { collection, owner };
        let log = make_log(self.factory, event.encode_log_data(), block);

        let mut inner = self.inner.lock().unwrap();
        inner.collections.insert(collection, state);
        inner.logs.push(log);
        inner.head = inner.head.max(block);
    }

    /// Emit `PromptAuctionFinished` from `emitter` at `block`. The emitter
    /// does not have to be a known collection, mirroring a hostile contract
    /// spoofing the event.
    pub fn emit_auction_finished(
        &self,
        emitter: Address,
        auction_id: u64,
        winner: Address,
        prompt: &str,
        block: u64,
    ) {
        let event = IAuctionCollection::PromptAuctionFinished {
            auctionId: U256::from(auction_id),
            winner,
            prompt: prompt.to_string(),
        };
        let log = make_log(emitter, event.encode_log_data(), block);

        let mut inner = self.inner.lock().unwrap();
        inner.logs.push(log);
        inner.head = inner.head.max(block);
    }

    pub fn set_auction(&self, collection: Address, auction_id: u64, auction: AuctionState) {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .collections
            .get_mut(&collection)
            .expect("unknown collection in set_auction");
        state.auctions.insert(auction_id, auction);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.inner.lock().unwrap().submissions.clone()
    }
}

fn make_log(address: Address, data: alloy::primitives::LogData, block: u64) -> Log {
    Log {
        inner: alloy::primitives::Log { address, data },
        block_hash: None,
        block_number: Some(block),
        block_timestamp: None,
        transaction_hash: Some(B256::ZERO),
        transaction_index: None,
        log_index: None,
        removed: false,
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.inner.lock().unwrap().head)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.inner.lock().unwrap().chain_id)
    }

    async fn logs(&self, from: u64, to: u64, topic0s: Vec<B256>) -> Result<Vec<Log>, ChainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .logs
            .iter()
            .filter(|log| {
                let block = log.block_number.unwrap_or(0);
                let topic0 = log.topics().first();
                block >= from
                    && block <= to
                    && topic0.map(|t| topic0s.contains(t)).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn collection_metadata(
        &self,
        collection: Address,
    ) -> Result<CollectionMetadata, ChainError> {
        let inner = self.inner.lock().unwrap();
        inner
            .collections
            .get(&collection)
            .map(|c| c.metadata)
            .ok_or_else(|| ChainError::Contract("unknown collection".to_string()))
    }

    async fn system_prompt_uri(&self, collection: Address) -> Result<String, ChainError> {
        let inner = self.inner.lock().unwrap();
        inner
            .collections
            .get(&collection)
            .map(|c| c.system_prompt_uri.clone())
            .ok_or_else(|| ChainError::Contract("unknown collection".to_string()))
    }

    async fn eip712_domain(&self, collection: Address) -> Result<CollectionDomain, ChainError> {
        let inner = self.inner.lock().unwrap();
        inner
            .collections
            .get(&collection)
            .map(|c| c.domain.clone())
            .ok_or_else(|| ChainError::Contract("unknown collection".to_string()))
    }

    async fn auction(
        &self,
        collection: Address,
        auction_id: u64,
    ) -> Result<AuctionState, ChainError> {
        let inner = self.inner.lock().unwrap();
        let state = inner
            .collections
            .get(&collection)
            .ok_or_else(|| ChainError::Contract("unknown collection".to_string()))?;

        // Unsettled auctions read back as empty records, like the contract's
        // default storage.
        Ok(state.auctions.get(&auction_id).cloned().unwrap_or(AuctionState {
            finished: false,
            highest_bidder: Address::ZERO,
            highest_bid: U256::ZERO,
            prompt: String::new(),
        }))
    }

    async fn submit_finish_auction(
        &self,
        collection: Address,
        auction_id: u64,
        uri: &str,
        signature: &[u8],
    ) -> Result<B256, ChainError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.collections.contains_key(&collection) {
            return Err(ChainError::Transaction("unknown collection".to_string()));
        }

        inner.submissions.push(Submission {
            collection,
            auction_id,
            uri: uri.to_string(),
            signature: signature.to_vec(),
        });
        Ok(B256::ZERO)
    }
}

// =============================================================================
// Clock / TEE / art / pinning doubles
// =============================================================================

/// Clock driven by the test, not the wall.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn at(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}

/// Deterministic derive key per identity; quotes echo the report data.
pub struct FakeTee {
    pub identity: u8,
}

#[async_trait]
impl TeeClient for FakeTee {
    async fn derive_key(&self, path: &str, subject: &str) -> Result<[u8; 32], TeeError> {
        let mut hasher = Sha256::new();
        hasher.update([self.identity]);
        hasher.update(path.as_bytes());
        hasher.update(subject.as_bytes());
        Ok(hasher.finalize().into())
    }

    async fn tdx_quote(&self, report_data: &[u8]) -> Result<String, TeeError> {
        Ok(alloy::hex::encode(report_data))
    }
}

/// Records every generation request and returns a fixed URL.
#[derive(Default)]
pub struct MockGenerator {
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate_url(&self, prompt: &str, system_prompt: &str) -> Result<String, ArtError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), system_prompt.to_string()));
        Ok("https://images.example/generated.png".to_string())
    }
}

/// Records pinned URLs and JSON bodies; returns fixed hashes.
#[derive(Default)]
pub struct RecordingPinner {
    pub pinned_urls: Mutex<Vec<String>>,
    pub pinned_json: Mutex<Vec<Value>>,
}

#[async_trait]
impl Pinner for RecordingPinner {
    async fn pin_url(&self, url: &str) -> Result<String, PinningError> {
        self.pinned_urls.lock().unwrap().push(url.to_string());
        Ok("QmImageHash".to_string())
    }

    async fn pin_json(&self, value: &Value) -> Result<String, PinningError> {
        self.pinned_json.lock().unwrap().push(value.clone());
        Ok("QmMetadataHash".to_string())
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn sim_collection(
    creation_timestamp: u64,
    auction_duration: u64,
    system_prompt_uri: &str,
) -> SimCollection {
    SimCollection {
        metadata: CollectionMetadata {
            creation_timestamp,
            auction_duration,
        },
        system_prompt_uri: system_prompt_uri.to_string(),
        domain: CollectionDomain {
            name: "C".to_string(),
            version: "1".to_string(),
            chain_id: U256::from(31337u64),
            verifying_contract: Address::repeat_byte(0x33),
        },
        auctions: HashMap::new(),
    }
}

pub fn bid(winner: Address, prompt: &str) -> AuctionState {
    AuctionState {
        finished: false,
        highest_bidder: winner,
        highest_bid: U256::from(20u64),
        prompt: prompt.to_string(),
    }
}

/// Poll until `predicate` holds or the timeout elapses.
pub async fn wait_until(timeout_ms: u64, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
    loop {
        if predicate() {
            return true;
        }
        if std::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
