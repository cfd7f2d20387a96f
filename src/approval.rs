//! Token approval pass-throughs.
//!
//! Thin wrappers over the NFT contract's own ERC-721/1155 approval surface.
//! No policy lives here: the market contracts expect approvals to be granted
//! out-of-band before a list or token-denominated bid, and the write paths
//! never pre-flight them.

use ethers::types::{Address, H256, U256};
use tracing::error;

use crate::chain::{ChainReader, ChainWriter};
use crate::codec;
use crate::error::Error;

pub struct ApprovalClient<R, W> {
    reader: R,
    writer: W,
}

impl<R: ChainReader, W: ChainWriter> ApprovalClient<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Approve `operator` for one token id (ERC-721 style).
    pub async fn approve(
        &self,
        nft_contract: Address,
        operator: Address,
        token_id: U256,
    ) -> Result<H256, Error> {
        match self
            .writer
            .submit(
                nft_contract,
                codec::approve_call(operator, token_id),
                U256::zero(),
            )
            .await
        {
            Ok(hash) => Ok(hash),
            Err(e) => {
                error!(error = %e, nft = ?nft_contract, "approve failed");
                Err(e)
            }
        }
    }

    /// Approve `operator` for all of the caller's tokens.
    pub async fn set_approval_for_all(
        &self,
        nft_contract: Address,
        operator: Address,
        approved: bool,
    ) -> Result<H256, Error> {
        match self
            .writer
            .submit(
                nft_contract,
                codec::set_approval_for_all_call(operator, approved),
                U256::zero(),
            )
            .await
        {
            Ok(hash) => Ok(hash),
            Err(e) => {
                error!(error = %e, nft = ?nft_contract, "setApprovalForAll failed");
                Err(e)
            }
        }
    }

    /// The operator approved for one token id, or the zero address.
    pub async fn get_approved(
        &self,
        nft_contract: Address,
        token_id: U256,
    ) -> Result<Address, Error> {
        let raw = self
            .reader
            .call(nft_contract, codec::get_approved_call(token_id))
            .await?;
        codec::decode_address(&raw)
    }

    /// Whether `operator` is approved for all of `owner`'s tokens.
    pub async fn is_approved_for_all(
        &self,
        nft_contract: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool, Error> {
        let raw = self
            .reader
            .call(nft_contract, codec::is_approved_for_all_call(owner, operator))
            .await?;
        codec::decode_bool(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::tests::MockChain;
    use ethers::abi::{self, Token};
    use ethers::types::Bytes;
    use std::sync::Arc;

    fn client(chain: &Arc<MockChain>) -> ApprovalClient<Arc<MockChain>, Arc<MockChain>> {
        ApprovalClient::new(Arc::clone(chain), Arc::clone(chain))
    }

    #[tokio::test]
    async fn test_approve_targets_token_contract_with_zero_value() {
        let chain = Arc::new(MockChain::new(1));
        let client = client(&chain);
        let nft = Address::repeat_byte(0x11);
        let operator = Address::repeat_byte(0x22);

        client.approve(nft, operator, U256::one()).await.unwrap();

        let submitted = chain.submitted.lock().unwrap();
        assert_eq!(submitted[0].to, nft);
        assert_eq!(submitted[0].value, U256::zero());
        assert_eq!(
            submitted[0].calldata,
            codec::approve_call(operator, U256::one())
        );
    }

    #[tokio::test]
    async fn test_set_approval_for_all_submits_flag() {
        let chain = Arc::new(MockChain::new(1));
        let client = client(&chain);
        let nft = Address::repeat_byte(0x11);
        let operator = Address::repeat_byte(0x22);

        client
            .set_approval_for_all(nft, operator, true)
            .await
            .unwrap();

        let submitted = chain.submitted.lock().unwrap();
        assert_eq!(
            submitted[0].calldata,
            codec::set_approval_for_all_call(operator, true)
        );
    }

    #[tokio::test]
    async fn test_get_approved_decodes_operator() {
        let chain = Arc::new(MockChain::new(1));
        let nft = Address::repeat_byte(0x11);
        let operator = Address::repeat_byte(0x22);
        chain.set_read(
            codec::get_approved_call(U256::one()),
            Bytes::from(abi::encode(&[Token::Address(operator)])),
        );

        let client = client(&chain);
        assert_eq!(client.get_approved(nft, U256::one()).await.unwrap(), operator);
    }

    #[tokio::test]
    async fn test_is_approved_for_all_decodes_flag() {
        let chain = Arc::new(MockChain::new(1));
        let nft = Address::repeat_byte(0x11);
        let owner = Address::repeat_byte(0x33);
        let operator = Address::repeat_byte(0x22);
        chain.set_read(
            codec::is_approved_for_all_call(owner, operator),
            Bytes::from(abi::encode(&[Token::Bool(true)])),
        );

        let client = client(&chain);
        assert!(client
            .is_approved_for_all(nft, owner, operator)
            .await
            .unwrap());
    }
}
