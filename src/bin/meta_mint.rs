//! Meta Mint discovery binary.
//!
//! Runs one discovery pass over the marketplace and auction contracts and
//! logs the active listings and auctions it finds.

use ethers::providers::{Http, Provider};
use meta_mint::auction::AuctionClient;
use meta_mint::chain::{EthersReader, EthersWriter};
use meta_mint::marketplace::MarketplaceClient;
use meta_mint::Config;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Meta Mint discovery");

    let config: Config = config::Config::builder()
        .add_source(config::File::with_name("meta-mint").required(false))
        .add_source(config::Environment::with_prefix("META_MINT"))
        .build()
        .and_then(|c| c.try_deserialize())
        .unwrap_or_else(|e| {
            // Defaults only cover a missing config; parse errors fail hard.
            let err_str = format!("{e}");
            if err_str.contains("not found") || err_str.contains("missing field") {
                warn!(error = %e, "No config file found, using defaults");
                Config::default()
            } else {
                error!(error = %e, "FATAL: Config error, fix env vars or meta-mint.toml");
                std::process::exit(1);
            }
        });

    info!(
        rpc = %config.rpc_url,
        marketplace = %config.marketplace_address,
        auction = %config.auction_address,
        lookback_blocks = config.scan.lookback_blocks,
        "Configuration loaded"
    );

    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())?;

    let marketplace = MarketplaceClient::new(
        config.marketplace()?,
        EthersReader::new(provider.clone()),
        EthersWriter::new(provider.clone()),
        config.scan.clone(),
    );
    let auction_house = AuctionClient::new(
        config.auction()?,
        EthersReader::new(provider.clone()),
        EthersWriter::new(provider),
        config.scan.clone(),
    );

    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT, cancelling discovery...");
            cancel_signal.cancel();
        }
    });

    if let Err(e) = marketplace.refresh(&cancel).await {
        error!(error = %e, "Listing discovery failed");
    }
    if let Err(e) = auction_house.refresh(&cancel).await {
        error!(error = %e, "Auction discovery failed");
    }

    let listings = marketplace.listings();
    for listing in &listings {
        info!(
            nft = ?listing.nft_contract,
            token_id = %listing.token_id,
            price = %listing.price,
            seller = ?listing.seller,
            payment_token = ?listing.payment_token,
            "Active listing"
        );
    }

    let auctions = auction_house.auctions();
    for auction in &auctions {
        info!(
            nft = ?auction.nft_contract,
            token_id = %auction.token_id,
            starting_price = %auction.starting_price,
            highest_bid = %auction.highest_bid,
            ends_at = %auction.end_time,
            "Active auction"
        );
    }

    info!(
        listings = listings.len(),
        auctions = auctions.len(),
        "Discovery complete"
    );

    // Machine-readable snapshot on stdout; logs stay on stderr.
    let snapshot = serde_json::json!({
        "listings": listings,
        "auctions": auctions,
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
