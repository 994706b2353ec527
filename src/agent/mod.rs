// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! # Agent
//!
//! Wires the components together and runs the settlement pipeline. Control
//! flow: chain → indexer → scheduler → settlement tasks → chain. The agent
//! owns the root of the task tree; everything it spawns inherits the same
//! cancellation token.
//!
//! Settlement of one `AuctionEnd` task: fetch the collection's EIP-712
//! domain, resolve its system prompt, generate the artwork, pin image +
//! metadata, sign the mint authorization, and submit `finishPromptAuction`
//! under the wallet's submission lock. A failure at any step logs and drops
//! the task. There is no automatic retry: a blind resubmission could
//! double-sign. An unsettled auction stays visible on-chain for operators.

pub mod api;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::art::ImageGenerator;
use crate::blockchain::{ChainClient, Wallet};
use crate::clock::Clock;
use crate::indexer::collections::CollectionRegistry;
use crate::indexer::scheduler::{AuctionEnd, AuctionScheduler, TASK_CHANNEL_CAPACITY};
use crate::indexer::Indexer;
use crate::pinning::NftPublisher;
use crate::prompt::PromptResolver;
use crate::tee::TeeClient;
use api::DecryptionPublicKey;

/// Everything the agent needs, passed at construction. Components are peers;
/// none of them holds a reference back to the agent.
pub struct AgentConfig {
    pub chain: Arc<dyn ChainClient>,
    pub wallet: Arc<Wallet>,
    pub registry: Arc<CollectionRegistry>,
    pub resolver: Arc<PromptResolver>,
    pub generator: Arc<dyn ImageGenerator>,
    pub publisher: Arc<NftPublisher>,
    pub tee: Arc<dyn TeeClient>,
    pub clock: Arc<dyn Clock>,
    pub factory_address: Address,
    pub api_bind_addr: String,
    pub decryption_pubkey: DecryptionPublicKey,
    pub event_poll_interval: Duration,
    pub auction_poll_interval: Duration,
}

/// The settlement agent. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct Agent {
    chain: Arc<dyn ChainClient>,
    wallet: Arc<Wallet>,
    registry: Arc<CollectionRegistry>,
    resolver: Arc<PromptResolver>,
    generator: Arc<dyn ImageGenerator>,
    publisher: Arc<NftPublisher>,
    tee: Arc<dyn TeeClient>,
    clock: Arc<dyn Clock>,
    factory_address: Address,
    api_bind_addr: String,
    decryption_pubkey: DecryptionPublicKey,
    event_poll_interval: Duration,
    auction_poll_interval: Duration,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            chain: config.chain,
            wallet: config.wallet,
            registry: config.registry,
            resolver: config.resolver,
            generator: config.generator,
            publisher: config.publisher,
            tee: config.tee,
            clock: config.clock,
            factory_address: config.factory_address,
            api_bind_addr: config.api_bind_addr,
            decryption_pubkey: config.decryption_pubkey,
            event_poll_interval: config.event_poll_interval,
            auction_poll_interval: config.auction_poll_interval,
        }
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet.address()
    }

    /// Run until the root token is cancelled: attestation API, initial
    /// synchronous scan, indexer and scheduler tickers, settlement fan-out.
    pub async fn run(self, shutdown: CancellationToken) {
        if self.api_bind_addr.is_empty() {
            tracing::info!("no API bind address configured, skipping attestation server");
        } else {
            let state = api::ApiState {
                wallet_address: self.wallet.address(),
                factory_address: self.factory_address,
                decryption_pubkey: self.decryption_pubkey.clone(),
                tee: self.tee.clone(),
            };
            tokio::spawn(api::serve(
                self.api_bind_addr.clone(),
                state,
                shutdown.clone(),
            ));
        }

        // Catch up with history before the scheduler starts sweeping, so the
        // per-collection auction counters are reconciled first.
        let mut indexer = Indexer::new(
            self.chain.clone(),
            self.registry.clone(),
            self.factory_address,
            self.event_poll_interval,
        );
        if let Err(e) = indexer.scan_once().await {
            tracing::warn!(error = %e, "initial event scan failed, continuing");
        }
        tokio::spawn(indexer.run(shutdown.clone()));

        let (tasks_tx, mut tasks_rx) = mpsc::channel::<AuctionEnd>(TASK_CHANNEL_CAPACITY);
        let scheduler = AuctionScheduler::new(
            self.registry.clone(),
            self.chain.clone(),
            self.clock.clone(),
            tasks_tx,
            self.auction_poll_interval,
        );
        tokio::spawn(scheduler.run(shutdown.clone()));

        loop {
            tokio::select! {
                maybe_task = tasks_rx.recv() => {
                    match maybe_task {
                        Some(task) => {
                            let agent = self.clone();
                            let token = shutdown.clone();
                            tokio::spawn(async move {
                                // In-flight settlements unwind on shutdown.
                                tokio::select! {
                                    _ = agent.settle(task) => {},
                                    _ = token.cancelled() => {},
                                }
                            });
                        }
                        None => break,
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        tracing::info!("agent stopped");
    }

    /// Settle one expired auction end-to-end. Every failure path logs and
    /// drops the task.
    pub async fn settle(&self, task: AuctionEnd) {
        tracing::info!(
            collection = %task.collection,
            auction_id = task.auction_id,
            winner = %task.winner,
            "settling auction"
        );

        let domain = match self.chain.eip712_domain(task.collection).await {
            Ok(domain) => domain,
            Err(e) => {
                tracing::warn!(collection = %task.collection, error = %e, "failed to get eip712 domain");
                return;
            }
        };

        let system_prompt = match self.resolver.resolve(task.collection).await {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(collection = %task.collection, error = %e, "failed to resolve system prompt");
                return;
            }
        };

        let art_url = match self
            .generator
            .generate_url(&task.prompt, &system_prompt)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(collection = %task.collection, error = %e, "failed to generate art");
                return;
            }
        };

        let metadata_uri = match self
            .publisher
            .publish(&domain.name, &task.prompt, &art_url)
            .await
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(collection = %task.collection, error = %e, "failed to pin artwork");
                return;
            }
        };

        let signature = match self
            .wallet
            .sign_mint(task.winner, &metadata_uri, &domain.eip712())
        {
            Ok(signature) => signature,
            Err(e) => {
                tracing::error!(collection = %task.collection, error = %e, "failed to sign mint authorization");
                return;
            }
        };

        // Single in-flight transaction per wallet: the lock spans only the
        // submit call.
        let _submission = self.wallet.lock_submission().await;
        match self
            .chain
            .submit_finish_auction(task.collection, task.auction_id, &metadata_uri, &signature)
            .await
        {
            Ok(tx_hash) => {
                tracing::info!(
                    collection = %task.collection,
                    auction_id = task.auction_id,
                    tx_hash = %tx_hash,
                    uri = %metadata_uri,
                    "auction settled"
                );
            }
            Err(e) => {
                tracing::warn!(
                    collection = %task.collection,
                    auction_id = task.auction_id,
                    error = %e,
                    "failed to submit settlement transaction"
                );
            }
        }
    }
}
