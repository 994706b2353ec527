// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! LRU cache for resolved system prompts.
//!
//! Keyed by collection address: a collection's system-prompt URI is fixed for
//! the lifetime of the contract, so the address is a sufficient key. Entries
//! expire after the TTL and are evicted approximately-LRU at capacity.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use lru::LruCache;

struct CacheEntry {
    prompt: String,
    inserted_at: Instant,
}

/// In-process LRU cache for resolved system prompts.
pub struct PromptCache {
    cache: Mutex<LruCache<Address, CacheEntry>>,
    ttl: Duration,
}

impl PromptCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Get the cached prompt for a collection, if present and fresh.
    pub fn get(&self, collection: Address) -> Option<String> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&collection) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.prompt.clone());
            }
            // Expired — remove it
            cache.pop(&collection);
        }
        None
    }

    /// Store the resolved prompt for a collection.
    pub fn put(&self, collection: Address, prompt: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                collection,
                CacheEntry {
                    prompt,
                    inserted_at: Instant::now(),
                },
            );
        }
    }
}
