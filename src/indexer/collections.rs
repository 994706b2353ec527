// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! In-memory registry of collections discovered on-chain.
//!
//! Entries are created when the factory's creation event is observed and are
//! never destroyed in-process. A collection is acted on only once both
//! initialization flags are set: metadata (creation timestamp + auction
//! duration, read via view calls) and the reconciled next auction id
//! (reconstructed from historical finish events on restart).

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::Address;

/// Per-collection state tracked by the indexer and consumed by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionInfo {
    pub metadata_initialized: bool,
    pub next_auction_id_initialized: bool,

    /// Collection deployment time, seconds since epoch.
    pub creation_timestamp: u64,
    /// Length of one auction window, seconds.
    pub auction_duration: u64,
    /// Lowest auction id not yet observed as settled. Monotonically
    /// non-decreasing for the lifetime of the process.
    pub next_auction_id: u64,
}

impl CollectionInfo {
    pub fn ready(&self) -> bool {
        self.metadata_initialized && self.next_auction_id_initialized
    }
}

/// Registry of all known collections behind a single process-wide lock.
///
/// The indexer writes, the scheduler reads and claims expired ids, and the
/// settlement workers never touch it; the indexer is single-threaded so the
/// contention window is tight.
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    cache: Mutex<HashMap<Address, CollectionInfo>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entry for a newly discovered collection. Idempotent.
    pub fn insert(&self, collection: Address) {
        let mut cache = self.cache.lock().expect("registry lock poisoned");
        cache.entry(collection).or_default();
    }

    pub fn contains(&self, collection: Address) -> bool {
        let cache = self.cache.lock().expect("registry lock poisoned");
        cache.contains_key(&collection)
    }

    /// Record a historical finish event. While the next auction id is still
    /// unreconciled, each observed settlement moves it to `auction_id + 1`;
    /// once reconciled the scheduler owns the counter and this is a no-op.
    pub fn note_finished(&self, collection: Address, auction_id: u64) {
        let mut cache = self.cache.lock().expect("registry lock poisoned");
        if let Some(info) = cache.get_mut(&collection) {
            if !info.next_auction_id_initialized {
                info.next_auction_id = auction_id + 1;
            }
        }
    }

    /// Attach the collection's on-chain metadata and set its flag.
    pub fn set_metadata(&self, collection: Address, creation_timestamp: u64, auction_duration: u64) {
        let mut cache = self.cache.lock().expect("registry lock poisoned");
        let info = cache.entry(collection).or_default();
        info.creation_timestamp = creation_timestamp;
        info.auction_duration = auction_duration;
        info.metadata_initialized = true;
    }

    /// Mark the next auction id as reconciled. Called after a full scan range
    /// has been processed for every collection discovered in that range.
    pub fn mark_next_id_initialized(&self, collection: Address) {
        let mut cache = self.cache.lock().expect("registry lock poisoned");
        if let Some(info) = cache.get_mut(&collection) {
            info.next_auction_id_initialized = true;
        }
    }

    /// Snapshot of every ready collection.
    pub fn ready_collections(&self) -> Vec<(Address, CollectionInfo)> {
        let cache = self.cache.lock().expect("registry lock poisoned");
        cache
            .iter()
            .filter(|(_, info)| info.ready())
            .map(|(addr, info)| (*addr, info.clone()))
            .collect()
    }

    /// Claim every expired auction id below `current_virtual_id`, advancing
    /// `next_auction_id` past them under the lock. Each id is returned exactly
    /// once per process lifetime; ids are in increasing order.
    pub fn claim_expired(&self, collection: Address, current_virtual_id: u64) -> Vec<u64> {
        let mut cache = self.cache.lock().expect("registry lock poisoned");
        let Some(info) = cache.get_mut(&collection) else {
            return Vec::new();
        };
        if !info.ready() {
            return Vec::new();
        }

        let mut claimed = Vec::new();
        while info.next_auction_id < current_virtual_id {
            claimed.push(info.next_auction_id);
            info.next_auction_id += 1;
        }
        claimed
    }

    /// Snapshot of a single collection, if known.
    pub fn get(&self, collection: Address) -> Option<CollectionInfo> {
        let cache = self.cache.lock().expect("registry lock poisoned");
        cache.get(&collection).cloned()
    }

    pub fn len(&self) -> usize {
        let cache = self.cache.lock().expect("registry lock poisoned");
        cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
