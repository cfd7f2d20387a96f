//! Event-window scanning and state reconciliation.
//!
//! Discovery is a two-phase pass shared by the listings and auctions flows:
//! scan a bounded window of recent blocks for creation events to collect
//! candidate keys, then reconcile each candidate with an authoritative state
//! read. Both phases run sequentially, one RPC call at a time, with fixed
//! politeness delays; a lost chunk or a failed read narrows the result set
//! instead of failing the run.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use ethers::types::{Address, Filter, H256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chain::ChainReader;
use crate::codec;
use crate::config::ScanConfig;
use crate::error::Error;
use crate::types::TokenKey;

/// Lifecycle of one discovery component.
///
/// A refresh triggered while another is `Running` is dropped, not queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Last pass ran to completion; the snapshot covers the full window.
    Done,
    /// Last pass was cancelled mid-way; the snapshot holds what was
    /// gathered up to that point.
    Cancelled,
    Failed(String),
}

/// Outcome of reconciling one candidate against current on-chain state.
///
/// `ReadFailed` is kept distinct from `Excluded` so the fail-closed skip is
/// auditable: a read failure drops the candidate exactly like an exclusion,
/// but for a different reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation<T> {
    /// Candidate is live; carries the fully-populated record.
    Included(T),
    /// Candidate exists but fails the inclusion rule (inactive, expired,
    /// zero price).
    Excluded,
    /// The state read failed; the candidate is dropped fail-closed.
    ReadFailed,
}

/// Scan the lookback window for creation events and return deduplicated
/// candidate keys in first-seen order.
///
/// The window `[head - lookback, head]` is covered in fixed-size chunks, one
/// `getLogs` call each, sequentially. A chunk that fails to fetch is logged
/// and skipped with no retry, so a transient RPC failure yields incomplete
/// discovery rather than an error. Cancellation is honored between calls.
pub async fn scan_candidates<R: ChainReader + ?Sized>(
    reader: &R,
    contract: Address,
    topic0: H256,
    scan: &ScanConfig,
    cancel: &CancellationToken,
) -> Result<Vec<TokenKey>, Error> {
    let head = reader.block_number().await?;
    let start = head.saturating_sub(scan.lookback_blocks);
    debug!(
        contract = ?contract,
        from_block = start,
        to_block = head,
        chunk_size = scan.chunk_size,
        "scanning for creation events"
    );

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut from = start;
    while from < head {
        if cancel.is_cancelled() {
            debug!(from_block = from, "scan cancelled");
            break;
        }
        let to = (from + scan.chunk_size).min(head);
        let filter = Filter::new()
            .address(contract)
            .topic0(topic0)
            .from_block(from)
            .to_block(to);
        match reader.get_logs(&filter).await {
            Ok(logs) => {
                for log in &logs {
                    if let Some(key) = codec::key_from_topics(&log.topics) {
                        if seen.insert(key) {
                            candidates.push(key);
                        }
                    }
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    from_block = from,
                    to_block = to,
                    "log fetch failed, skipping chunk"
                );
            }
        }
        from = to;
        if from < head && scan.chunk_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(scan.chunk_delay_ms)).await;
        }
    }

    debug!(candidates = candidates.len(), "scan complete");
    Ok(candidates)
}

/// One full discovery pass: scan for candidates, then reconcile each with the
/// caller-supplied read. Only `Included` records are returned; `Excluded` and
/// `ReadFailed` candidates are dropped (the latter with a warning).
pub async fn discover<R, T, F, Fut>(
    reader: &R,
    contract: Address,
    topic0: H256,
    scan: &ScanConfig,
    cancel: &CancellationToken,
    reconcile: F,
) -> Result<Vec<T>, Error>
where
    R: ChainReader + ?Sized,
    F: Fn(TokenKey) -> Fut,
    Fut: Future<Output = Reconciliation<T>>,
{
    let candidates = scan_candidates(reader, contract, topic0, scan, cancel).await?;
    let mut included = Vec::new();
    for key in candidates {
        if cancel.is_cancelled() {
            debug!(key = %key, "reconciliation cancelled");
            break;
        }
        match reconcile(key).await {
            Reconciliation::Included(record) => included.push(record),
            Reconciliation::Excluded => {}
            Reconciliation::ReadFailed => {
                warn!(key = %key, "state read failed, dropping candidate");
            }
        }
        if scan.read_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(scan.read_delay_ms)).await;
        }
    }
    Ok(included)
}
