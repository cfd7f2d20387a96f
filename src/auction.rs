//! Auction discovery and auction write operations.
//!
//! Same discovery shape as the marketplace flow with one extra rule: expiry.
//! The clock is snapshotted once per pass so every candidate is judged
//! against the same instant, and the comparison is strict — an auction whose
//! end time equals the snapshot is already over.

use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use ethers::types::{Address, Bytes, H256, U256};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chain::{ChainReader, ChainWriter};
use crate::codec;
use crate::config::ScanConfig;
use crate::error::Error;
use crate::scan::{self, Reconciliation, RunState};
use crate::types::{is_native, Auction, TokenKey};

/// Client for the auction contract: bulk auction discovery plus the
/// create/bid/end write path.
pub struct AuctionClient<R, W> {
    contract: Address,
    reader: R,
    writer: W,
    scan: ScanConfig,
    state: Mutex<Snapshot>,
}

struct Snapshot {
    run: RunState,
    auctions: Vec<Auction>,
}

impl<R: ChainReader, W: ChainWriter> AuctionClient<R, W> {
    pub fn new(contract: Address, reader: R, writer: W, scan: ScanConfig) -> Self {
        Self {
            contract,
            reader,
            writer,
            scan,
            state: Mutex::new(Snapshot {
                run: RunState::Idle,
                auctions: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// One discovery pass: scan `AuctionCreated` events, then read each
    /// candidate through `auctions` and keep those that are active, have a
    /// nonzero starting price, and have not expired. A trigger while a pass
    /// is already running is dropped.
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<(), Error> {
        self.refresh_at(cancel, now_secs()).await
    }

    async fn refresh_at(&self, cancel: &CancellationToken, now: u64) -> Result<(), Error> {
        {
            let mut state = self.lock();
            if state.run == RunState::Running {
                info!("auction discovery already running, dropping trigger");
                return Ok(());
            }
            state.run = RunState::Running;
        }

        let topic = codec::event_topic(codec::AUCTION_CREATED_SIG);
        let result = scan::discover(&self.reader, self.contract, topic, &self.scan, cancel, |key| {
            self.reconcile(key, now)
        })
        .await;

        let mut state = self.lock();
        match result {
            Ok(auctions) => {
                let run = if cancel.is_cancelled() {
                    info!(auctions = auctions.len(), "auction discovery cancelled, snapshot is partial");
                    RunState::Cancelled
                } else {
                    info!(auctions = auctions.len(), "auction discovery complete");
                    RunState::Done
                };
                state.auctions = auctions;
                state.run = run;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "auction discovery failed");
                state.run = RunState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn reconcile(&self, key: TokenKey, now: u64) -> Reconciliation<Auction> {
        let raw = match self.reader.call(self.contract, codec::auctions_call(&key)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, key = %key, "auction read failed");
                return Reconciliation::ReadFailed;
            }
        };
        match codec::decode_auction(&raw) {
            Ok(auction) if is_live(&auction, now) => Reconciliation::Included(auction),
            Ok(_) => Reconciliation::Excluded,
            Err(e) => {
                warn!(error = %e, key = %key, "auction decode failed");
                Reconciliation::ReadFailed
            }
        }
    }

    /// The latest discovered snapshot.
    pub fn auctions(&self) -> Vec<Auction> {
        self.lock().auctions.clone()
    }

    pub fn run_state(&self) -> RunState {
        self.lock().run.clone()
    }

    /// Authoritative single-auction read with the same inclusion rule as
    /// discovery. `Ok(None)` means inactive, unfunded, or expired.
    pub async fn read_auction(&self, key: TokenKey) -> Result<Option<Auction>, Error> {
        let raw = self
            .reader
            .call(self.contract, codec::auctions_call(&key))
            .await?;
        let auction = codec::decode_auction(&raw)?;
        Ok(is_live(&auction, now_secs()).then_some(auction))
    }

    // --- Write path ---

    /// Open an auction running for `duration` seconds.
    pub async fn create_auction(
        &self,
        key: TokenKey,
        starting_price: U256,
        duration: U256,
        amount: U256,
        is_erc1155: bool,
        payment_token: Address,
    ) -> Result<H256, Error> {
        let calldata = codec::create_auction_call(
            &key,
            starting_price,
            duration,
            amount,
            is_erc1155,
            payment_token,
        );
        self.submit("createAuction", calldata, U256::zero()).await
    }

    /// Place a bid. Native-currency bids attach the bid as transaction value;
    /// token bids attach zero and pass the amount as an argument only, the
    /// contract pulls tokens via a prior approval.
    pub async fn place_bid(
        &self,
        key: TokenKey,
        bid: U256,
        payment_token: Address,
    ) -> Result<H256, Error> {
        let value = if is_native(payment_token) {
            bid
        } else {
            U256::zero()
        };
        self.submit("placeBid", codec::place_bid_call(&key, bid), value)
            .await
    }

    /// Settle an auction past its end time.
    pub async fn end_auction(&self, key: TokenKey) -> Result<H256, Error> {
        self.submit("endAuction", codec::end_auction_call(&key), U256::zero())
            .await
    }

    async fn submit(&self, op: &str, calldata: Bytes, value: U256) -> Result<H256, Error> {
        match self.writer.submit(self.contract, calldata, value).await {
            Ok(hash) => {
                info!(op, tx = ?hash, "transaction submitted");
                Ok(hash)
            }
            Err(e) => {
                error!(op, error = %e, "transaction submission failed");
                Err(e)
            }
        }
    }
}

fn is_live(auction: &Auction, now: u64) -> bool {
    auction.is_active
        && auction.starting_price > U256::zero()
        && auction.end_time > U256::from(now)
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
