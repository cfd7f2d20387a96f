//! # Meta Mint client
//!
//! Off-chain client for the Meta Mint NFT marketplace and auction contracts.
//! Active listings and auctions are discovered by scanning a bounded window of
//! recent blocks for creation events, then reconciling each candidate against
//! the authoritative on-chain record. Write operations (list, buy, delist,
//! create auction, bid, end auction, token approvals) build calldata and hand
//! it to whatever transaction submitter the embedding application provides.
//!
//! ## Quick Start
//! ```bash
//! META_MINT_RPC_URL=https://... cargo run --bin meta-mint
//! ```

pub mod approval;
pub mod auction;
pub mod chain;
pub mod codec;
pub mod config;
mod error;
pub mod marketplace;
pub mod scan;
pub mod types;

pub use config::{Config, ScanConfig};
pub use error::Error;
pub use scan::{Reconciliation, RunState};
