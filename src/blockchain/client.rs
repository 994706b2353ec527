// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Narrow chain-client interface and its RPC-backed implementation.
//!
//! The indexer, scheduler, and settlement pipeline consume only this trait:
//! log filtering, block height, chain id, the collection view methods, and
//! settlement submission. Production binds it to an alloy HTTP provider; the
//! test suite substitutes an in-process simulator. No retries happen at this
//! layer; errors surface to the callers, which log and continue on the next
//! tick.

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, Bytes, B256, U256},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{Filter, Log},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use super::contracts::IAuctionCollection;
use super::types::{AuctionState, ChainError, CollectionDomain, CollectionMetadata};

/// HTTP provider type with all fillers plus the agent wallet.
type HttpProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// The chain surface the agent consumes.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain head.
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Chain id for transaction construction and the wallet identity.
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Logs in `[from, to]` whose first topic is any of `topic0s`.
    async fn logs(&self, from: u64, to: u64, topic0s: Vec<B256>) -> Result<Vec<Log>, ChainError>;

    /// `creationTimestamp()` and `auctionDuration()` of a collection.
    async fn collection_metadata(
        &self,
        collection: Address,
    ) -> Result<CollectionMetadata, ChainError>;

    /// `systemPromptUri()` of a collection.
    async fn system_prompt_uri(&self, collection: Address) -> Result<String, ChainError>;

    /// `eip712Domain()` of a collection.
    async fn eip712_domain(&self, collection: Address) -> Result<CollectionDomain, ChainError>;

    /// `getAuction(auctionId)` of a collection.
    async fn auction(&self, collection: Address, auction_id: u64)
        -> Result<AuctionState, ChainError>;

    /// Submit `finishPromptAuction(auctionId, uri, signature)`.
    async fn submit_finish_auction(
        &self,
        collection: Address,
        auction_id: u64,
        uri: &str,
        signature: &[u8],
    ) -> Result<B256, ChainError>;
}

/// Production chain client backed by an alloy HTTP provider.
pub struct RpcChainClient {
    provider: HttpProvider,
}

impl RpcChainClient {
    /// Connect to the chain node. The signer backs the wallet filler used for
    /// settlement submission.
    pub fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);

        Ok(Self { provider })
    }

    fn collection(&self, address: Address) -> IAuctionCollection::IAuctionCollectionInstance<HttpProvider> {
        IAuctionCollection::new(address, self.provider.clone())
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn logs(&self, from: u64, to: u64, topic0s: Vec<B256>) -> Result<Vec<Log>, ChainError> {
        let filter = Filter::new()
            .from_block(from)
            .to_block(to)
            .event_signature(topic0s);

        self.provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn collection_metadata(
        &self,
        collection: Address,
    ) -> Result<CollectionMetadata, ChainError> {
        let contract = self.collection(collection);

        let creation_timestamp = contract
            .creationTimestamp()
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        let auction_duration = contract
            .auctionDuration()
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        Ok(CollectionMetadata {
            creation_timestamp,
            auction_duration,
        })
    }

    async fn system_prompt_uri(&self, collection: Address) -> Result<String, ChainError> {
        self.collection(collection)
            .systemPromptUri()
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }

    async fn eip712_domain(&self, collection: Address) -> Result<CollectionDomain, ChainError> {
        let domain = self
            .collection(collection)
            .eip712Domain()
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        Ok(CollectionDomain {
            name: domain.name,
            version: domain.version,
            chain_id: domain.chainId,
            verifying_contract: domain.verifyingContract,
        })
    }

    async fn auction(
        &self,
        collection: Address,
        auction_id: u64,
    ) -> Result<AuctionState, ChainError> {
        let auction = self
            .collection(collection)
            .getAuction(U256::from(auction_id))
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        Ok(AuctionState {
            finished: auction.finished,
            highest_bidder: auction.highestBidder,
            highest_bid: auction.highestBid,
            prompt: auction.prompt,
        })
    }

    async fn submit_finish_auction(
        &self,
        collection: Address,
        auction_id: u64,
        uri: &str,
        signature: &[u8],
    ) -> Result<B256, ChainError> {
        let pending = self
            .collection(collection)
            .finishPromptAuction(
                U256::from(auction_id),
                uri.to_string(),
                Bytes::copy_from_slice(signature),
            )
            .send()
            .await
            .map_err(|e| ChainError::Transaction(e.to_string()))?;

        Ok(*pending.tx_hash())
    }
}
