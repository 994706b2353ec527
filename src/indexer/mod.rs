// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! # Event Indexer
//!
//! Background task that tails the chain for two event classes: the factory's
//! `CollectionCreated` and the collections' `PromptAuctionFinished`.
//!
//! ## Strategy
//!
//! One code path serves both bootstrap and steady state: every scan walks
//! `[last_indexed_block + 1, head]` (from genesis on the very first scan) in
//! fixed-size chunks of `eth_getLogs`. Creation events from the factory
//! create registry entries and kick off asynchronous metadata initialization
//! in a bounded pool; finish events reconcile each collection's next auction
//! id from history. Collections observed only through finish events are never
//! registered, so the agent acts solely on factory-created collections.
//!
//! ## Checkpointing
//!
//! `last_indexed_block` is advanced only after a scanned range has been fully
//! applied to the registry. There is no persistence: a restart rescans from
//! genesis and rebuilds the same state.

pub mod collections;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::blockchain::contracts::{IAuctionCollection, IAuctionFactory};
use crate::blockchain::{ChainClient, ChainError};
use collections::CollectionRegistry;

/// Block span per `eth_getLogs` query.
const INDEXING_CHUNK_SIZE: u64 = 10_000;

/// Concurrent metadata-initialization calls; bounds RPC fan-out when a large
/// factory is scanned from genesis.
const INIT_POOL_SIZE: usize = 100;

/// Default interval between incremental scans.
pub const DEFAULT_EVENT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Chain(#[from] ChainError),
}

/// Chunked event indexer maintaining the collection registry.
pub struct Indexer {
    chain: Arc<dyn ChainClient>,
    registry: Arc<CollectionRegistry>,
    factory_address: Address,
    init_pool: Arc<Semaphore>,
    last_indexed_block: u64,
    poll_interval: Duration,
}

impl Indexer {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        registry: Arc<CollectionRegistry>,
        factory_address: Address,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            registry,
            factory_address,
            init_pool: Arc::new(Semaphore::new(INIT_POOL_SIZE)),
            last_indexed_block: 0,
            poll_interval,
        }
    }

    /// Run the incremental scan loop until cancellation.
    ///
    /// Should be spawned as a background task after an initial `scan_once`:
    /// ```rust,ignore
    /// tokio::spawn(indexer.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(
            factory = %self.factory_address,
            interval_secs = self.poll_interval.as_secs(),
            "event indexer starting"
        );

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("event indexer shutting down");
                return;
            }

            if let Err(e) = self.scan_once().await {
                tracing::warn!(error = %e, "indexing step failed, will retry");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    tracing::info!("event indexer shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one scan from the checkpoint to the current head.
    ///
    /// On error the checkpoint is left untouched; the next tick retries the
    /// same range. Re-scanning a range is idempotent over the registry.
    pub async fn scan_once(&mut self) -> Result<(), IndexerError> {
        let head = self.chain.block_number().await?;

        let start = if self.last_indexed_block == 0 {
            0
        } else {
            self.last_indexed_block + 1
        };

        if start > head {
            return Ok(());
        }

        tracing::debug!(from_block = start, to_block = head, "indexing events");

        // Collections first seen in this range: their next auction id is
        // reconciled only once every finish event of the range (possibly in a
        // later chunk) has been applied.
        let mut discovered: Vec<Address> = Vec::new();

        let mut from = start;
        while from <= head {
            let to = (from + INDEXING_CHUNK_SIZE - 1).min(head);

            let logs = self
                .chain
                .logs(
                    from,
                    to,
                    vec![
                        IAuctionFactory::CollectionCreated::SIGNATURE_HASH,
                        IAuctionCollection::PromptAuctionFinished::SIGNATURE_HASH,
                    ],
                )
                .await?;

            tracing::debug!(count = logs.len(), from_block = from, to_block = to, "processing logs");

            for log in &logs {
                self.apply_log(log, &mut discovered);
            }

            from = to + 1;
        }

        for collection in &discovered {
            self.registry.mark_next_id_initialized(*collection);
            tracing::info!(collection = %collection, "reconciled next auction id");
        }

        self.last_indexed_block = head;
        Ok(())
    }

    fn apply_log(&self, log: &Log, discovered: &mut Vec<Address>) {
        let Some(topic0) = log.topics().first().copied() else {
            return;
        };

        if topic0 == IAuctionFactory::CollectionCreated::SIGNATURE_HASH {
            // Only the factory mints collections the agent will settle.
            if log.address() != self.factory_address {
                return;
            }

            let event = match log.log_decode::<IAuctionFactory::CollectionCreated>() {
                Ok(decoded) => decoded.inner.data,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode CollectionCreated event");
                    return;
                }
            };

            tracing::info!(collection = %event.collection, owner = %event.owner, "new collection created");
            self.registry.insert(event.collection);
            discovered.push(event.collection);
            self.spawn_metadata_init(event.collection);
        } else if topic0 == IAuctionCollection::PromptAuctionFinished::SIGNATURE_HASH {
            let collection = log.address();
            if !self.registry.contains(collection) {
                tracing::warn!(collection = %collection, "finish event from unknown collection, skipping");
                return;
            }

            let event = match log.log_decode::<IAuctionCollection::PromptAuctionFinished>() {
                Ok(decoded) => decoded.inner.data,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode PromptAuctionFinished event");
                    return;
                }
            };

            let auction_id: u64 = event.auctionId.saturating_to();
            tracing::info!(collection = %collection, auction_id, "prompt auction finished on-chain");
            self.registry.note_finished(collection, auction_id);
        }
    }

    /// Read `creationTimestamp` and `auctionDuration` in the background,
    /// bounded by the init pool.
    fn spawn_metadata_init(&self, collection: Address) {
        let chain = self.chain.clone();
        let registry = self.registry.clone();
        let pool = self.init_pool.clone();

        tokio::spawn(async move {
            let Ok(_permit) = pool.acquire_owned().await else {
                return;
            };

            match chain.collection_metadata(collection).await {
                Ok(metadata) => {
                    registry.set_metadata(
                        collection,
                        metadata.creation_timestamp,
                        metadata.auction_duration,
                    );
                    tracing::info!(
                        collection = %collection,
                        creation_timestamp = metadata.creation_timestamp,
                        auction_duration = metadata.auction_duration,
                        "collection metadata initialized"
                    );
                }
                Err(e) => {
                    tracing::warn!(collection = %collection, error = %e, "failed to initialize collection metadata");
                }
            }
        });
    }

    /// Highest block already applied to the registry.
    pub fn last_indexed_block(&self) -> u64 {
        self.last_indexed_block
    }
}

