//! ABI plumbing for the marketplace, auction, and token contracts.
//!
//! The contract surface is small and fixed, so selectors and tuple layouts are
//! spelled out here instead of going through generated bindings.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::{id, keccak256};

use crate::error::Error;
use crate::types::{Auction, Listing, TokenKey};

/// `NFTListed(seller, nftContract, tokenId, price, paymentToken)` with the
/// first three parameters indexed.
pub const NFT_LISTED_SIG: &str = "NFTListed(address,address,uint256,uint256,address)";

/// `AuctionCreated(seller, nftContract, tokenId, startingPrice, endTime,
/// paymentToken)` with the first three parameters indexed.
pub const AUCTION_CREATED_SIG: &str =
    "AuctionCreated(address,address,uint256,uint256,uint256,address)";

/// Topic0 hash for an event signature.
pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

/// Recover the candidate key from a creation event's indexed topics.
///
/// Both creation events index (seller, nftContract, tokenId) as topics 1..=3.
/// Logs with too few topics are not ours and yield no candidate.
pub fn key_from_topics(topics: &[H256]) -> Option<TokenKey> {
    if topics.len() < 4 {
        return None;
    }
    let nft_contract = Address::from_slice(&topics[2].as_bytes()[12..]);
    let token_id = U256::from_big_endian(topics[3].as_bytes());
    Some(TokenKey::new(nft_contract, token_id))
}

fn call_data(selector: [u8; 4], tokens: &[Token]) -> Bytes {
    let mut data = selector.to_vec();
    data.extend(abi::encode(tokens));
    Bytes::from(data)
}

// --- Read calls ---

/// `listings(nftContract, tokenId)`
pub fn listings_call(key: &TokenKey) -> Bytes {
    call_data(
        id("listings(address,uint256)"),
        &[Token::Address(key.nft_contract), Token::Uint(key.token_id)],
    )
}

/// `auctions(nftContract, tokenId)`
pub fn auctions_call(key: &TokenKey) -> Bytes {
    call_data(
        id("auctions(address,uint256)"),
        &[Token::Address(key.nft_contract), Token::Uint(key.token_id)],
    )
}

const LISTING_LAYOUT: [ParamType; 8] = [
    ParamType::Address,   // seller
    ParamType::Address,   // nftContract
    ParamType::Uint(256), // tokenId
    ParamType::Uint(256), // amount
    ParamType::Uint(256), // price
    ParamType::Bool,      // isActive
    ParamType::Bool,      // isERC1155
    ParamType::Address,   // paymentToken
];

const AUCTION_LAYOUT: [ParamType; 11] = [
    ParamType::Address,   // seller
    ParamType::Address,   // nftContract
    ParamType::Uint(256), // tokenId
    ParamType::Uint(256), // amount
    ParamType::Uint(256), // startingPrice
    ParamType::Uint(256), // endTime
    ParamType::Address,   // highestBidder
    ParamType::Uint(256), // highestBid
    ParamType::Bool,      // isActive
    ParamType::Bool,      // isERC1155
    ParamType::Address,   // paymentToken
];

/// Decode the `listings` return tuple.
pub fn decode_listing(data: &[u8]) -> Result<Listing, Error> {
    let tokens = abi::decode(&LISTING_LAYOUT, data).map_err(|e| Error::Codec(e.to_string()))?;
    let mut it = tokens.into_iter();
    Ok(Listing {
        seller: next_address(&mut it)?,
        nft_contract: next_address(&mut it)?,
        token_id: next_uint(&mut it)?,
        amount: next_uint(&mut it)?,
        price: next_uint(&mut it)?,
        is_active: next_bool(&mut it)?,
        is_erc1155: next_bool(&mut it)?,
        payment_token: next_address(&mut it)?,
    })
}

/// Decode the `auctions` return tuple.
pub fn decode_auction(data: &[u8]) -> Result<Auction, Error> {
    let tokens = abi::decode(&AUCTION_LAYOUT, data).map_err(|e| Error::Codec(e.to_string()))?;
    let mut it = tokens.into_iter();
    Ok(Auction {
        seller: next_address(&mut it)?,
        nft_contract: next_address(&mut it)?,
        token_id: next_uint(&mut it)?,
        amount: next_uint(&mut it)?,
        starting_price: next_uint(&mut it)?,
        end_time: next_uint(&mut it)?,
        highest_bidder: next_address(&mut it)?,
        highest_bid: next_uint(&mut it)?,
        is_active: next_bool(&mut it)?,
        is_erc1155: next_bool(&mut it)?,
        payment_token: next_address(&mut it)?,
    })
}

/// Decode a single returned address (`getApproved`).
pub fn decode_address(data: &[u8]) -> Result<Address, Error> {
    let tokens =
        abi::decode(&[ParamType::Address], data).map_err(|e| Error::Codec(e.to_string()))?;
    next_address(&mut tokens.into_iter())
}

/// Decode a single returned bool (`isApprovedForAll`).
pub fn decode_bool(data: &[u8]) -> Result<bool, Error> {
    let tokens = abi::decode(&[ParamType::Bool], data).map_err(|e| Error::Codec(e.to_string()))?;
    next_bool(&mut tokens.into_iter())
}

// --- Write calls: marketplace ---

/// `listNFT(nftContract, tokenId, price, amount, isERC1155, paymentToken)`
pub fn list_nft_call(
    key: &TokenKey,
    price: U256,
    amount: U256,
    is_erc1155: bool,
    payment_token: Address,
) -> Bytes {
    call_data(
        id("listNFT(address,uint256,uint256,uint256,bool,address)"),
        &[
            Token::Address(key.nft_contract),
            Token::Uint(key.token_id),
            Token::Uint(price),
            Token::Uint(amount),
            Token::Bool(is_erc1155),
            Token::Address(payment_token),
        ],
    )
}

/// `buyNFT(nftContract, tokenId)`
pub fn buy_nft_call(key: &TokenKey) -> Bytes {
    call_data(
        id("buyNFT(address,uint256)"),
        &[Token::Address(key.nft_contract), Token::Uint(key.token_id)],
    )
}

/// `delistNFT(nftContract, tokenId)`
pub fn delist_nft_call(key: &TokenKey) -> Bytes {
    call_data(
        id("delistNFT(address,uint256)"),
        &[Token::Address(key.nft_contract), Token::Uint(key.token_id)],
    )
}

// --- Write calls: auction ---

/// `createAuction(nftContract, tokenId, startingPrice, duration, amount,
/// isERC1155, paymentToken)`
pub fn create_auction_call(
    key: &TokenKey,
    starting_price: U256,
    duration: U256,
    amount: U256,
    is_erc1155: bool,
    payment_token: Address,
) -> Bytes {
    call_data(
        id("createAuction(address,uint256,uint256,uint256,uint256,bool,address)"),
        &[
            Token::Address(key.nft_contract),
            Token::Uint(key.token_id),
            Token::Uint(starting_price),
            Token::Uint(duration),
            Token::Uint(amount),
            Token::Bool(is_erc1155),
            Token::Address(payment_token),
        ],
    )
}

/// `placeBid(nftContract, tokenId, bidAmount)`
///
/// The bid amount is always an argument; for native-currency auctions the
/// caller additionally attaches it as transaction value.
pub fn place_bid_call(key: &TokenKey, bid: U256) -> Bytes {
    call_data(
        id("placeBid(address,uint256,uint256)"),
        &[
            Token::Address(key.nft_contract),
            Token::Uint(key.token_id),
            Token::Uint(bid),
        ],
    )
}

/// `endAuction(nftContract, tokenId)`
pub fn end_auction_call(key: &TokenKey) -> Bytes {
    call_data(
        id("endAuction(address,uint256)"),
        &[Token::Address(key.nft_contract), Token::Uint(key.token_id)],
    )
}

// --- Token approvals (ERC-721/1155) ---

/// `approve(operator, tokenId)`
pub fn approve_call(operator: Address, token_id: U256) -> Bytes {
    call_data(
        id("approve(address,uint256)"),
        &[Token::Address(operator), Token::Uint(token_id)],
    )
}

/// `setApprovalForAll(operator, approved)`
pub fn set_approval_for_all_call(operator: Address, approved: bool) -> Bytes {
    call_data(
        id("setApprovalForAll(address,bool)"),
        &[Token::Address(operator), Token::Bool(approved)],
    )
}

/// `getApproved(tokenId)`
pub fn get_approved_call(token_id: U256) -> Bytes {
    call_data(id("getApproved(uint256)"), &[Token::Uint(token_id)])
}

/// `isApprovedForAll(owner, operator)`
pub fn is_approved_for_all_call(owner: Address, operator: Address) -> Bytes {
    call_data(
        id("isApprovedForAll(address,address)"),
        &[Token::Address(owner), Token::Address(operator)],
    )
}

// --- Test encoders (mock chain return data) ---

#[cfg(test)]
pub(crate) fn encode_listing(l: &Listing) -> Bytes {
    Bytes::from(abi::encode(&[
        Token::Address(l.seller),
        Token::Address(l.nft_contract),
        Token::Uint(l.token_id),
        Token::Uint(l.amount),
        Token::Uint(l.price),
        Token::Bool(l.is_active),
        Token::Bool(l.is_erc1155),
        Token::Address(l.payment_token),
    ]))
}

#[cfg(test)]
pub(crate) fn encode_auction(a: &Auction) -> Bytes {
    Bytes::from(abi::encode(&[
        Token::Address(a.seller),
        Token::Address(a.nft_contract),
        Token::Uint(a.token_id),
        Token::Uint(a.amount),
        Token::Uint(a.starting_price),
        Token::Uint(a.end_time),
        Token::Address(a.highest_bidder),
        Token::Uint(a.highest_bid),
        Token::Bool(a.is_active),
        Token::Bool(a.is_erc1155),
        Token::Address(a.payment_token),
    ]))
}

fn next_address(it: &mut impl Iterator<Item = Token>) -> Result<Address, Error> {
    match it.next() {
        Some(Token::Address(a)) => Ok(a),
        other => Err(Error::Codec(format!("expected address, got {other:?}"))),
    }
}

fn next_uint(it: &mut impl Iterator<Item = Token>) -> Result<U256, Error> {
    match it.next() {
        Some(Token::Uint(u)) => Ok(u),
        other => Err(Error::Codec(format!("expected uint, got {other:?}"))),
    }
}

fn next_bool(it: &mut impl Iterator<Item = Token>) -> Result<bool, Error> {
    match it.next() {
        Some(Token::Bool(b)) => Ok(b),
        other => Err(Error::Codec(format!("expected bool, got {other:?}"))),
    }
}
