//! Client configuration.

use ethers::types::Address;
use serde::Deserialize;

use crate::error::Error;

/// Configuration for the Meta Mint client.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    #[serde(default = "defaults::zero_address")]
    pub marketplace_address: String,

    #[serde(default = "defaults::zero_address")]
    pub auction_address: String,

    #[serde(default)]
    pub scan: ScanConfig,
}

/// Discovery scan window.
///
/// The defaults replicate the window the contracts were operated with: the
/// last 100k blocks (roughly 2-3 weeks) in 5k-block chunks. A larger lookback
/// buys completeness at the cost of more `getLogs` calls; a larger chunk size
/// cuts call count but risks RPC result-size limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "defaults::lookback_blocks")]
    pub lookback_blocks: u64,

    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: u64,

    /// Politeness delay between `getLogs` calls, not an adaptive backoff.
    #[serde(default = "defaults::chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Politeness delay between per-candidate state reads.
    #[serde(default = "defaults::read_delay_ms")]
    pub read_delay_ms: u64,
}

impl Config {
    pub fn marketplace(&self) -> Result<Address, Error> {
        parse_address("marketplace_address", &self.marketplace_address)
    }

    pub fn auction(&self) -> Result<Address, Error> {
        parse_address("auction_address", &self.auction_address)
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("invalid {field} '{value}': {e}")))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: defaults::rpc_url(),
            marketplace_address: defaults::zero_address(),
            auction_address: defaults::zero_address(),
            scan: ScanConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback_blocks: defaults::lookback_blocks(),
            chunk_size: defaults::chunk_size(),
            chunk_delay_ms: defaults::chunk_delay_ms(),
            read_delay_ms: defaults::read_delay_ms(),
        }
    }
}

mod defaults {
    pub fn rpc_url() -> String {
        "http://127.0.0.1:8545".into()
    }

    pub fn zero_address() -> String {
        "0x0000000000000000000000000000000000000000".into()
    }

    pub fn lookback_blocks() -> u64 {
        100_000
    }

    pub fn chunk_size() -> u64 {
        5_000
    }

    pub fn chunk_delay_ms() -> u64 {
        100
    }

    pub fn read_delay_ms() -> u64 {
        50
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scan_window() {
        let scan = ScanConfig::default();
        assert_eq!(scan.lookback_blocks, 100_000);
        assert_eq!(scan.chunk_size, 5_000);
        assert_eq!(scan.chunk_delay_ms, 100);
        assert_eq!(scan.read_delay_ms, 50);
    }

    #[test]
    fn test_default_addresses_parse() {
        let config = Config::default();
        assert!(config.marketplace().unwrap().is_zero());
        assert!(config.auction().unwrap().is_zero());
    }

    #[test]
    fn test_invalid_address_is_config_error() {
        let config = Config {
            marketplace_address: "not-an-address".into(),
            ..Config::default()
        };
        assert!(matches!(config.marketplace(), Err(Error::Config(_))));
    }
}
