//! External chain collaborators: read-only RPC access and transaction
//! submission.
//!
//! The discovery and write paths are written against these two traits so the
//! rest of the crate never touches a concrete provider. `EthersReader` and
//! `EthersWriter` adapt any [`ethers`] middleware; the embedding application
//! decides which signer (if any) sits underneath.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Filter, Log, TransactionRequest, H256, U256};

use crate::error::Error;

/// Read-only chain access: block height, log queries, contract view calls.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current block height.
    async fn block_number(&self) -> Result<u64, Error>;

    /// Logs matching `filter` (address, topic0, block range).
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, Error>;

    /// Read-only contract call; returns the raw return data.
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, Error>;
}

/// Transaction submission. Returns the hash of the submitted transaction;
/// confirmation is not awaited and receipts are never polled.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn submit(&self, to: Address, calldata: Bytes, value: U256) -> Result<H256, Error>;
}

#[async_trait]
impl<T: ChainReader + ?Sized> ChainReader for Arc<T> {
    async fn block_number(&self) -> Result<u64, Error> {
        (**self).block_number().await
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, Error> {
        (**self).get_logs(filter).await
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, Error> {
        (**self).call(to, calldata).await
    }
}

#[async_trait]
impl<T: ChainWriter + ?Sized> ChainWriter for Arc<T> {
    async fn submit(&self, to: Address, calldata: Bytes, value: U256) -> Result<H256, Error> {
        (**self).submit(to, calldata, value).await
    }
}

/// [`ChainReader`] over an ethers middleware.
pub struct EthersReader<M> {
    inner: M,
}

impl<M: Middleware> EthersReader<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainReader for EthersReader<M> {
    async fn block_number(&self) -> Result<u64, Error> {
        let n = self
            .inner
            .get_block_number()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))?;
        Ok(n.as_u64())
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, Error> {
        self.inner
            .get_logs(filter)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, Error> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(calldata).into();
        self.inner
            .call(&tx, None)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }
}

/// [`ChainWriter`] over an ethers middleware. The middleware must carry a
/// signer for submissions to succeed.
pub struct EthersWriter<M> {
    inner: M,
}

impl<M: Middleware> EthersWriter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainWriter for EthersWriter<M> {
    async fn submit(&self, to: Address, calldata: Bytes, value: U256) -> Result<H256, Error> {
        let tx = TransactionRequest::new().to(to).data(calldata).value(value);
        let pending = self
            .inner
            .send_transaction(tx, None)
            .await
            .map_err(|e| Error::Tx(e.to_string()))?;
        Ok(*pending)
    }
}

// --- Test helpers (shared across module tests) ---
