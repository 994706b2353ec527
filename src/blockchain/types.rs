// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Shared chain-facing types and the chain error taxonomy.

use alloy::primitives::{Address, U256};
use alloy::sol_types::Eip712Domain;

/// Errors that can occur during chain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

/// Static collection parameters read once per collection after discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionMetadata {
    /// Collection deployment time, seconds since epoch.
    pub creation_timestamp: u64,
    /// Length of one auction window, seconds.
    pub auction_duration: u64,
}

/// On-chain auction record as returned by `getAuction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionState {
    pub finished: bool,
    pub highest_bidder: Address,
    pub highest_bid: U256,
    pub prompt: String,
}

/// A collection's EIP-712 domain as reported by `eip712Domain()`.
///
/// The mint signature is verified on-chain against exactly these fields; any
/// divergence in the domain set is a consensus-level bug, so the raw values
/// are kept and the alloy domain is built on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDomain {
    pub name: String,
    pub version: String,
    pub chain_id: U256,
    pub verifying_contract: Address,
}

impl CollectionDomain {
    /// Build the alloy typed-data domain (name, version, chainId,
    /// verifyingContract; no salt).
    pub fn eip712(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(self.name.clone().into()),
            Some(self.version.clone().into()),
            Some(self.chain_id),
            Some(self.verifying_contract),
            None,
        )
    }
}
