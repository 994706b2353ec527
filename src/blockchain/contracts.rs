// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Contract bindings for the collection factory and per-collection contracts,
//! plus the typed-data struct the mint authorization is signed over.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IAuctionFactory {
        /// Emitted by the factory for every collection it deploys.
        event CollectionCreated(address indexed collection, address indexed owner);

        function isRegisteredCollection(address collection) external view returns (bool);
    }

    #[sol(rpc)]
    interface IAuctionCollection {
        /// Emitted by a collection once an auction has been settled on-chain.
        event PromptAuctionFinished(uint256 indexed auctionId, address winner, string prompt);

        function systemPromptUri() external view returns (string);
        function creationTimestamp() external view returns (uint64);
        function auctionDuration() external view returns (uint64);
        function getAuction(uint256 auctionId)
            external
            view
            returns (bool finished, address highestBidder, uint256 highestBid, string prompt);
        function eip712Domain()
            external
            view
            returns (
                bytes1 fields,
                string name,
                string version,
                uint256 chainId,
                address verifyingContract,
                bytes32 salt,
                uint256[] extensions
            );
        function finishPromptAuction(uint256 auctionId, string uri, bytes signature) external;
    }

    /// Typed-data payload the collection verifies before minting. Must match
    /// the contract byte for byte: `Mint(address to,string uri)`.
    #[derive(Debug)]
    struct Mint {
        address to;
        string uri;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;
    use alloy::sol_types::{SolEvent, SolStruct};

    #[test]
    fn collection_created_topic_is_correct() {
        assert_eq!(
            IAuctionFactory::CollectionCreated::SIGNATURE_HASH,
            keccak256("CollectionCreated(address,address)")
        );
    }

    #[test]
    fn prompt_auction_finished_topic_is_correct() {
        assert_eq!(
            IAuctionCollection::PromptAuctionFinished::SIGNATURE_HASH,
            keccak256("PromptAuctionFinished(uint256,address,string)")
        );
    }

    #[test]
    fn mint_type_string_matches_contract() {
        assert_eq!(Mint::eip712_root_type(), "Mint(address to,string uri)");
    }
}
