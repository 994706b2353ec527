// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! # Auction Scheduler
//!
//! Background sweep that derives virtual auction windows from each ready
//! collection's parameters and emits a settlement task exactly once per
//! expired auction. Auction `n` of a collection occupies
//! `[creation + n*duration, creation + (n+1)*duration)`; it is expired once
//! the wall clock passes its end, i.e. once the current virtual id exceeds
//! `n`.
//!
//! The registry advances `next_auction_id` under its lock *before* the probe
//! task is forked, so a crash loses at most the in-flight task; the id is
//! re-derivable after restart from the chain's own finish events. Probes for
//! one collection run sequentially, so tasks are emitted in increasing id
//! order per collection.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::blockchain::ChainClient;
use crate::clock::Clock;

use super::collections::CollectionRegistry;

/// Default interval between scheduler sweeps.
pub const DEFAULT_AUCTION_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Capacity of the settlement task channel. When full, the sweep blocks; the
/// chain re-exposes the same state on the next sweep, so nothing is lost.
pub const TASK_CHANNEL_CAPACITY: usize = 1000;

/// An expired auction with a bidder, ready for settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionEnd {
    pub collection: Address,
    pub auction_id: u64,
    pub winner: Address,
    pub prompt: String,
}

/// Periodic sweep emitting `AuctionEnd` tasks for expired auctions.
pub struct AuctionScheduler {
    registry: Arc<CollectionRegistry>,
    chain: Arc<dyn ChainClient>,
    clock: Arc<dyn Clock>,
    tasks: mpsc::Sender<AuctionEnd>,
    poll_interval: Duration,
}

impl AuctionScheduler {
    pub fn new(
        registry: Arc<CollectionRegistry>,
        chain: Arc<dyn ChainClient>,
        clock: Arc<dyn Clock>,
        tasks: mpsc::Sender<AuctionEnd>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            chain,
            clock,
            tasks,
            poll_interval,
        }
    }

    /// Run the sweep loop until cancellation.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            "auction scheduler starting"
        );

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("auction scheduler shutting down");
                return;
            }

            self.sweep();

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    tracing::info!("auction scheduler shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep over every ready collection: claim all expired ids and fork
    /// a probe chain per collection.
    pub fn sweep(&self) {
        let now = self.clock.now_unix();

        for (collection, info) in self.registry.ready_collections() {
            let current =
                current_virtual_id(now, info.creation_timestamp, info.auction_duration);
            let expired = self.registry.claim_expired(collection, current);
            if expired.is_empty() {
                continue;
            }

            tracing::info!(
                collection = %collection,
                auction_ids = ?expired,
                "auction windows expired"
            );

            let chain = self.chain.clone();
            let tasks = self.tasks.clone();
            tokio::spawn(async move {
                // Sequential per collection: tasks leave in increasing id order.
                for auction_id in expired {
                    probe_auction(chain.as_ref(), &tasks, collection, auction_id).await;
                }
            });
        }
    }
}

/// The auction id whose window contains `now`; ids below it are expired.
pub fn current_virtual_id(now: u64, creation_timestamp: u64, auction_duration: u64) -> u64 {
    if auction_duration == 0 || now <= creation_timestamp {
        return 0;
    }
    (now - creation_timestamp) / auction_duration
}

/// Read the auction record and emit a settlement task when it has a bidder.
async fn probe_auction(
    chain: &dyn ChainClient,
    tasks: &mpsc::Sender<AuctionEnd>,
    collection: Address,
    auction_id: u64,
) {
    let auction = match chain.auction(collection, auction_id).await {
        Ok(auction) => auction,
        Err(e) => {
            tracing::warn!(
                collection = %collection,
                auction_id,
                error = %e,
                "failed to read auction record"
            );
            return;
        }
    };

    if auction.highest_bidder == Address::ZERO {
        tracing::debug!(collection = %collection, auction_id, "auction had no bids, dropping");
        return;
    }

    let task = AuctionEnd {
        collection,
        auction_id,
        winner: auction.highest_bidder,
        prompt: auction.prompt,
    };

    if tasks.send(task).await.is_err() {
        tracing::warn!(collection = %collection, auction_id, "settlement channel closed");
    }
}
