// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Chain integration: contract bindings, the narrow chain-client interface,
//! and the enclave wallet.

pub mod client;
pub mod contracts;
pub mod types;
pub mod wallet;

pub use client::{ChainClient, RpcChainClient};
pub use types::{AuctionState, ChainError, CollectionDomain, CollectionMetadata};
pub use wallet::{signer_from_seed, Wallet, WalletError};
