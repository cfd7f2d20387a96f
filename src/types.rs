//! Domain model: read-only snapshots of on-chain marketplace state.
//!
//! The client never owns these entities. Each discovery pass replaces the
//! previous snapshot wholesale; there is no incremental patching.

use std::fmt;

use ethers::types::{Address, U256};
use serde::Serialize;

/// Whether a payment-token field denotes the chain's native currency.
///
/// The zero address is the universal sentinel: native payments attach the
/// amount as transaction value, any other address is a fungible token the
/// caller must have approved out-of-band.
pub fn is_native(payment_token: Address) -> bool {
    payment_token.is_zero()
}

/// The (NFT contract, token id) pair that uniquely keys a listing or auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TokenKey {
    pub nft_contract: Address,
    pub token_id: U256,
}

impl TokenKey {
    pub fn new(nft_contract: Address, token_id: U256) -> Self {
        Self {
            nft_contract,
            token_id,
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.nft_contract, self.token_id)
    }
}

/// One active fixed-price sale offer, as read from the marketplace contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub seller: Address,
    pub nft_contract: Address,
    pub token_id: U256,
    /// Unit count, relevant for ERC-1155 listings.
    pub amount: U256,
    pub price: U256,
    pub is_active: bool,
    pub is_erc1155: bool,
    pub payment_token: Address,
}

impl Listing {
    pub fn key(&self) -> TokenKey {
        TokenKey::new(self.nft_contract, self.token_id)
    }
}

/// One active bidding process, as read from the auction contract.
///
/// An auction is actionable only while `is_active` and `end_time` is still in
/// the future; expiry is client-computed until settlement happens on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Auction {
    pub seller: Address,
    pub nft_contract: Address,
    pub token_id: U256,
    pub amount: U256,
    pub starting_price: U256,
    /// Seconds since epoch.
    pub end_time: U256,
    pub highest_bidder: Address,
    pub highest_bid: U256,
    pub is_active: bool,
    pub is_erc1155: bool,
    pub payment_token: Address,
}

impl Auction {
    pub fn key(&self) -> TokenKey {
        TokenKey::new(self.nft_contract, self.token_id)
    }
}
