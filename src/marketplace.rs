//! Listing discovery and marketplace write operations.

use std::sync::{Mutex, MutexGuard};

use ethers::types::{Address, Bytes, H256, U256};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chain::{ChainReader, ChainWriter};
use crate::codec;
use crate::config::ScanConfig;
use crate::error::Error;
use crate::scan::{self, Reconciliation, RunState};
use crate::types::{is_native, Listing, TokenKey};

/// Client for the marketplace contract: bulk listing discovery plus the
/// list/buy/delist write path.
pub struct MarketplaceClient<R, W> {
    contract: Address,
    reader: R,
    writer: W,
    scan: ScanConfig,
    state: Mutex<Snapshot>,
}

struct Snapshot {
    run: RunState,
    listings: Vec<Listing>,
}

impl<R: ChainReader, W: ChainWriter> MarketplaceClient<R, W> {
    pub fn new(contract: Address, reader: R, writer: W, scan: ScanConfig) -> Self {
        Self {
            contract,
            reader,
            writer,
            scan,
            state: Mutex::new(Snapshot {
                run: RunState::Idle,
                listings: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// One discovery pass: scan `NFTListed` events, then read each candidate
    /// through `listings` and keep those that are active with a nonzero
    /// price. The result replaces the previous snapshot wholesale; on failure
    /// the previous snapshot is left untouched and the run state carries the
    /// error. A trigger while a pass is already running is dropped.
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<(), Error> {
        {
            let mut state = self.lock();
            if state.run == RunState::Running {
                info!("listing discovery already running, dropping trigger");
                return Ok(());
            }
            state.run = RunState::Running;
        }

        let topic = codec::event_topic(codec::NFT_LISTED_SIG);
        let result = scan::discover(&self.reader, self.contract, topic, &self.scan, cancel, |key| {
            self.reconcile(key)
        })
        .await;

        let mut state = self.lock();
        match result {
            Ok(listings) => {
                let run = if cancel.is_cancelled() {
                    info!(listings = listings.len(), "listing discovery cancelled, snapshot is partial");
                    RunState::Cancelled
                } else {
                    info!(listings = listings.len(), "listing discovery complete");
                    RunState::Done
                };
                state.listings = listings;
                state.run = run;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "listing discovery failed");
                state.run = RunState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn reconcile(&self, key: TokenKey) -> Reconciliation<Listing> {
        let raw = match self.reader.call(self.contract, codec::listings_call(&key)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, key = %key, "listing read failed");
                return Reconciliation::ReadFailed;
            }
        };
        match codec::decode_listing(&raw) {
            Ok(listing) if is_live(&listing) => Reconciliation::Included(listing),
            Ok(_) => Reconciliation::Excluded,
            Err(e) => {
                warn!(error = %e, key = %key, "listing decode failed");
                Reconciliation::ReadFailed
            }
        }
    }

    /// The latest discovered snapshot.
    pub fn listings(&self) -> Vec<Listing> {
        self.lock().listings.clone()
    }

    pub fn run_state(&self) -> RunState {
        self.lock().run.clone()
    }

    /// Authoritative single-listing read with the same inclusion rule as
    /// discovery. `Ok(None)` means inactive or zero-priced.
    pub async fn read_listing(&self, key: TokenKey) -> Result<Option<Listing>, Error> {
        let raw = self
            .reader
            .call(self.contract, codec::listings_call(&key))
            .await?;
        let listing = codec::decode_listing(&raw)?;
        Ok(is_live(&listing).then_some(listing))
    }

    // --- Write path ---

    /// Put an NFT up for sale at a fixed price.
    pub async fn list_nft(
        &self,
        key: TokenKey,
        price: U256,
        amount: U256,
        is_erc1155: bool,
        payment_token: Address,
    ) -> Result<H256, Error> {
        let calldata = codec::list_nft_call(&key, price, amount, is_erc1155, payment_token);
        self.submit("listNFT", calldata, U256::zero()).await
    }

    /// Buy a listed NFT. Native-currency purchases attach the price as
    /// transaction value; token purchases attach zero and rely on a prior
    /// approval.
    pub async fn buy_nft(
        &self,
        key: TokenKey,
        price: U256,
        payment_token: Address,
    ) -> Result<H256, Error> {
        let value = if is_native(payment_token) {
            price
        } else {
            U256::zero()
        };
        self.submit("buyNFT", codec::buy_nft_call(&key), value).await
    }

    /// Withdraw an active listing.
    pub async fn delist_nft(&self, key: TokenKey) -> Result<H256, Error> {
        self.submit("delistNFT", codec::delist_nft_call(&key), U256::zero())
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

fn is_live(listing: &Listing) -> bool {
    listing.is_active && listing.price > U256::zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::tests::{creation_log, test_scan, MockChain};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn market() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn listing(nft: Address, token_id: u64, price: u64, active: bool) -> Listing {
        Listing {
            seller: Address::repeat_byte(0x01),
            nft_contract: nft,
            token_id: U256::from(token_id),
            amount: U256::one(),
            price: U256::from(price),
            is_active: active,
            is_erc1155: false,
            payment_token: Address::zero(),
        }
    }

    fn client(chain: &Arc<MockChain>) -> MarketplaceClient<Arc<MockChain>, Arc<MockChain>> {
        MarketplaceClient::new(market(), Arc::clone(chain), Arc::clone(chain), test_scan())
    }

    fn announce(chain: &MockChain, l: &Listing, block: u64) {
        let topic = codec::event_topic(codec::NFT_LISTED_SIG);
        chain.push_log(creation_log(
            market(),
            topic,
            l.nft_contract,
            l.token_id,
            block,
        ));
        chain.set_read(codec::listings_call(&l.key()), codec::encode_listing(l));
    }

    #[tokio::test]
    async fn test_refresh_keeps_active_priced_listings() {
        let chain = Arc::new(MockChain::new(100));
        let live = listing(Address::repeat_byte(1), 1, 1_000, true);
        let inactive = listing(Address::repeat_byte(2), 2, 1_000, false);
        let free = listing(Address::repeat_byte(3), 3, 0, true);
        announce(&chain, &live, 5);
        announce(&chain, &inactive, 15);
        announce(&chain, &free, 25);

        let client = client(&chain);
        client.refresh(&CancellationToken::new()).await.unwrap();

        assert_eq!(client.listings(), vec![live]);
        assert_eq!(client.run_state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_refresh_result_has_no_duplicate_keys() {
        let chain = Arc::new(MockChain::new(100));
        let live = listing(Address::repeat_byte(1), 1, 1_000, true);
        // Listed, delisted, listed again: two events, one key.
        announce(&chain, &live, 5);
        announce(&chain, &live, 55);

        let client = client(&chain);
        client.refresh(&CancellationToken::new()).await.unwrap();

        let keys: Vec<TokenKey> = client.listings().iter().map(|l| l.key()).collect();
        let unique: HashSet<&TokenKey> = keys.iter().collect();
        assert_eq!(keys.len(), unique.len());
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn test_relisted_then_delisted_key_is_excluded() {
        let chain = Arc::new(MockChain::new(100));
        // Two NFTListed events for the same key, but the authoritative read
        // says the listing is no longer active.
        let gone = listing(Address::repeat_byte(1), 1, 1_000, false);
        announce(&chain, &gone, 5);
        announce(&chain, &gone, 55);

        let client = client(&chain);
        client.refresh(&CancellationToken::new()).await.unwrap();
        assert!(client.listings().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_skips_failed_read_keeps_others() {
        let chain = Arc::new(MockChain::new(100));
        let live = listing(Address::repeat_byte(1), 1, 1_000, true);
        let broken = listing(Address::repeat_byte(2), 2, 1_000, true);
        announce(&chain, &live, 5);
        announce(&chain, &broken, 15);
        chain.fail_read(codec::listings_call(&broken.key()));

        let client = client(&chain);
        client.refresh(&CancellationToken::new()).await.unwrap();
        assert_eq!(client.listings(), vec![live]);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent_for_unchanged_chain() {
        let chain = Arc::new(MockChain::new(100));
        let a = listing(Address::repeat_byte(1), 1, 1_000, true);
        let b = listing(Address::repeat_byte(2), 2, 2_000, true);
        announce(&chain, &a, 5);
        announce(&chain, &b, 45);

        let client = client(&chain);
        client.refresh(&CancellationToken::new()).await.unwrap();
        let first: HashSet<TokenKey> = client.listings().iter().map(|l| l.key()).collect();
        client.refresh(&CancellationToken::new()).await.unwrap();
        let second: HashSet<TokenKey> = client.listings().iter().map(|l| l.key()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_dropped_while_running() {
        let chain = Arc::new(MockChain::new(100));
        let live = listing(Address::repeat_byte(1), 1, 1_000, true);
        announce(&chain, &live, 5);

        let client = client(&chain);
        client.lock().run = RunState::Running;

        client.refresh(&CancellationToken::new()).await.unwrap();
        // The trigger was dropped: nothing scanned, state untouched.
        assert!(client.listings().is_empty());
        assert_eq!(client.run_state(), RunState::Running);
    }

    #[tokio::test]
    async fn test_cancelled_refresh_is_not_reported_done() {
        let chain = Arc::new(MockChain::new(100));
        let live = listing(Address::repeat_byte(1), 1, 1_000, true);
        announce(&chain, &live, 5);

        let client = client(&chain);
        let cancel = CancellationToken::new();
        cancel.cancel();
        client.refresh(&cancel).await.unwrap();

        // A partial snapshot must not look like a complete pass.
        assert_eq!(client.run_state(), RunState::Cancelled);
        assert!(client.listings().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_snapshot() {
        let chain = Arc::new(MockChain::new(100));
        let live = listing(Address::repeat_byte(1), 1, 1_000, true);
        announce(&chain, &live, 5);

        let client = client(&chain);
        client.refresh(&CancellationToken::new()).await.unwrap();
        assert_eq!(client.listings().len(), 1);

        chain.fail_next_block_number();
        let err = client.refresh(&CancellationToken::new()).await;
        assert!(err.is_err());
        assert!(matches!(client.run_state(), RunState::Failed(_)));
        // Stale but present.
        assert_eq!(client.listings().len(), 1);
    }

    #[tokio::test]
    async fn test_read_listing_excludes_inactive() {
        let chain = Arc::new(MockChain::new(100));
        let gone = listing(Address::repeat_byte(1), 1, 1_000, false);
        chain.set_read(
            codec::listings_call(&gone.key()),
            codec::encode_listing(&gone),
        );

        let client = client(&chain);
        assert_eq!(client.read_listing(gone.key()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_buy_nft_native_attaches_value() {
        let chain = Arc::new(MockChain::new(100));
        let client = client(&chain);
        let key = TokenKey::new(Address::repeat_byte(1), U256::one());
        let price = U256::from(1_000_000_000_000_000_000u64);

        client.buy_nft(key, price, Address::zero()).await.unwrap();

        let submitted = chain.submitted.lock().unwrap();
        assert_eq!(submitted[0].to, market());
        assert_eq!(submitted[0].value, price);
        assert_eq!(submitted[0].calldata, codec::buy_nft_call(&key));
    }

    #[tokio::test]
    async fn test_buy_nft_token_payment_attaches_zero_value() {
        let chain = Arc::new(MockChain::new(100));
        let client = client(&chain);
        let key = TokenKey::new(Address::repeat_byte(1), U256::one());

        client
            .buy_nft(key, U256::from(1_000u64), Address::repeat_byte(0x77))
            .await
            .unwrap();

        let submitted = chain.submitted.lock().unwrap();
        assert_eq!(submitted[0].value, U256::zero());
    }

    #[tokio::test]
    async fn test_list_nft_submits_expected_calldata() {
        let chain = Arc::new(MockChain::new(100));
        let client = client(&chain);
        let key = TokenKey::new(Address::repeat_byte(1), U256::from(9u64));
        let payment = Address::repeat_byte(0x77);

        client
            .list_nft(key, U256::from(500u64), U256::from(3u64), true, payment)
            .await
            .unwrap();

        let submitted = chain.submitted.lock().unwrap();
        assert_eq!(
            submitted[0].calldata,
            codec::list_nft_call(&key, U256::from(500u64), U256::from(3u64), true, payment)
        );
        assert_eq!(submitted[0].value, U256::zero());
    }

    #[tokio::test]
    async fn test_delist_nft_targets_marketplace() {
        let chain = Arc::new(MockChain::new(100));
        let client = client(&chain);
        let key = TokenKey::new(Address::repeat_byte(1), U256::one());

        client.delist_nft(key).await.unwrap();

        let submitted = chain.submitted.lock().unwrap();
        assert_eq!(submitted[0].to, market());
        assert_eq!(submitted[0].calldata, codec::delist_nft_call(&key));
    }
}
