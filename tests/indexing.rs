// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Indexer behavior over the simulated chain: discovery, idempotent
//! re-scanning, chunked history walks, and restart recovery of the
//! per-collection auction counter.

mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;

use atelier_agent::indexer::collections::CollectionRegistry;
use atelier_agent::indexer::Indexer;
use common::{sim_collection, wait_until, SimulatedChain};

const FACTORY: Address = Address::repeat_byte(0xfa);
const COLLECTION: Address = Address::repeat_byte(0xc0);
const OWNER: Address = Address::repeat_byte(0x01);
const USER: Address = Address::repeat_byte(0x02);

fn indexer(chain: &Arc<SimulatedChain>, registry: &Arc<CollectionRegistry>) -> Indexer {
    let chain: Arc<dyn atelier_agent::blockchain::ChainClient> = chain.clone();
    Indexer::new(chain, registry.clone(), FACTORY, Duration::from_millis(10))
}

#[tokio::test]
async fn scan_discovers_and_initializes_collections() {
    let chain = Arc::new(SimulatedChain::new(FACTORY));
    chain.add_collection(COLLECTION, OWNER, 5, sim_collection(1000, 100, "http://unused"));
    chain.set_head(10);

    let registry = Arc::new(CollectionRegistry::new());
    indexer(&chain, &registry).scan_once().await.unwrap();

    // Metadata initialization runs in the background pool.
    let ready = wait_until(2000, || {
        registry.get(COLLECTION).map(|i| i.ready()).unwrap_or(false)
    })
    .await;
    assert!(ready, "collection never became ready");

    let info = registry.get(COLLECTION).unwrap();
    assert_eq!(info.creation_timestamp, 1000);
    assert_eq!(info.auction_duration, 100);
    assert_eq!(info.next_auction_id, 0);
}

#[tokio::test]
async fn rescanning_the_same_history_is_idempotent() {
    let chain = Arc::new(SimulatedChain::new(FACTORY));
    chain.add_collection(COLLECTION, OWNER, 1, sim_collection(1000, 100, "http://unused"));
    chain.emit_auction_finished(COLLECTION, 0, USER, "p0", 2);
    chain.set_head(5);

    let registry = Arc::new(CollectionRegistry::new());
    indexer(&chain, &registry).scan_once().await.unwrap();
    assert!(wait_until(2000, || registry
        .get(COLLECTION)
        .map(|i| i.ready())
        .unwrap_or(false))
    .await);
    let first = registry.get(COLLECTION).unwrap();

    // A second worker scanning the same chain into the same registry must
    // observe, not perturb.
    indexer(&chain, &registry).scan_once().await.unwrap();
    assert!(wait_until(2000, || registry
        .get(COLLECTION)
        .map(|i| i.ready())
        .unwrap_or(false))
    .await);
    assert_eq!(registry.get(COLLECTION).unwrap(), first);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn restart_recovers_next_auction_id_from_finish_events() {
    let chain = Arc::new(SimulatedChain::new(FACTORY));
    chain.add_collection(COLLECTION, OWNER, 1, sim_collection(1000, 100, "http://unused"));
    for auction_id in 0..=2u64 {
        chain.emit_auction_finished(COLLECTION, auction_id, USER, "p", 2 + auction_id);
    }
    chain.set_head(10);

    // A fresh worker walks history from genesis.
    let registry = Arc::new(CollectionRegistry::new());
    indexer(&chain, &registry).scan_once().await.unwrap();

    assert!(wait_until(2000, || registry
        .get(COLLECTION)
        .map(|i| i.ready())
        .unwrap_or(false))
    .await);
    assert_eq!(registry.get(COLLECTION).unwrap().next_auction_id, 3);
}

#[tokio::test]
async fn finish_events_from_unknown_emitters_are_ignored() {
    let chain = Arc::new(SimulatedChain::new(FACTORY));
    let rogue = Address::repeat_byte(0xbd);
    chain.emit_auction_finished(rogue, 0, USER, "spoofed", 3);
    chain.set_head(5);

    let registry = Arc::new(CollectionRegistry::new());
    indexer(&chain, &registry).scan_once().await.unwrap();

    assert!(registry.is_empty());
}

#[tokio::test]
async fn creation_events_not_from_the_factory_are_ignored() {
    let chain = Arc::new(SimulatedChain::new(FACTORY));
    chain.add_collection(COLLECTION, OWNER, 1, sim_collection(1000, 100, "http://unused"));
    chain.set_head(5);

    // Same chain, but the worker watches a different factory.
    let registry = Arc::new(CollectionRegistry::new());
    let chain_dyn: Arc<dyn atelier_agent::blockchain::ChainClient> = chain.clone();
    let mut other = Indexer::new(
        chain_dyn,
        registry.clone(),
        Address::repeat_byte(0xee),
        Duration::from_millis(10),
    );
    other.scan_once().await.unwrap();

    assert!(registry.is_empty());
}

#[tokio::test]
async fn history_spanning_multiple_chunks_is_fully_applied() {
    let chain = Arc::new(SimulatedChain::new(FACTORY));
    // Events across three 10,000-block chunks.
    chain.add_collection(COLLECTION, OWNER, 500, sim_collection(1000, 100, "http://unused"));
    chain.emit_auction_finished(COLLECTION, 0, USER, "p", 12_000);
    chain.emit_auction_finished(COLLECTION, 1, USER, "p", 24_000);
    chain.set_head(25_000);

    let registry = Arc::new(CollectionRegistry::new());
    let mut idx = indexer(&chain, &registry);
    idx.scan_once().await.unwrap();

    assert_eq!(idx.last_indexed_block(), 25_000);
    assert!(wait_until(2000, || registry
        .get(COLLECTION)
        .map(|i| i.ready())
        .unwrap_or(false))
    .await);
    // The finish event in the last chunk still counts: reconciliation happens
    // after the whole range.
    assert_eq!(registry.get(COLLECTION).unwrap().next_auction_id, 2);
}

#[tokio::test]
async fn incremental_scan_picks_up_new_events_only() {
    let chain = Arc::new(SimulatedChain::new(FACTORY));
    chain.add_collection(COLLECTION, OWNER, 1, sim_collection(1000, 100, "http://unused"));
    chain.set_head(5);

    let registry = Arc::new(CollectionRegistry::new());
    let mut idx = indexer(&chain, &registry);
    idx.scan_once().await.unwrap();
    assert!(wait_until(2000, || registry
        .get(COLLECTION)
        .map(|i| i.ready())
        .unwrap_or(false))
    .await);

    // New finish event after the checkpoint. The counter is already
    // reconciled, so it must not move.
    chain.emit_auction_finished(COLLECTION, 7, USER, "late", 6);
    chain.set_head(8);
    idx.scan_once().await.unwrap();

    assert_eq!(idx.last_indexed_block(), 8);
    assert_eq!(registry.get(COLLECTION).unwrap().next_auction_id, 0);
}
