//! The membership contract over JSON-RPC.
//!
//! Reads go through `eth_call` on the read endpoint; writes go through
//! `eth_sendTransaction` on the wallet endpoint, which signs them.

use crate::abi::{self, selector, Token};
use crate::client::JsonRpcClient;
use crate::error::Error;
use async_trait::async_trait;
use knightfall_session::{Address, Ledger, TokenId, TxHash};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct Receipt {
    /// `0x1` on success. Absent before Byzantium.
    status: Option<String>,
}

/// [`Ledger`] backed by a read endpoint and an optional signing endpoint.
#[derive(Debug)]
pub struct RpcLedger {
    read: JsonRpcClient,
    write: Option<JsonRpcClient>,
    contract: Address,
    poll_interval: Duration,
}

impl RpcLedger {
    /// Ledger that can only read.
    pub fn new(read: JsonRpcClient, contract: Address) -> Self {
        Self {
            read,
            write: None,
            contract,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sign and submit writes through `write`.
    #[must_use]
    pub fn with_signer(mut self, write: JsonRpcClient) -> Self {
        self.write = Some(write);
        self
    }

    /// Set the receipt polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn call(&self, data: String) -> crate::Result<Vec<u8>> {
        let params = json!([{ "to": self.contract, "data": data }, "latest"]);
        let result: String = self.read.request("eth_call", params).await?;
        abi::decode_hex(&result)
    }

    async fn send(&self, from: &Address, data: String) -> crate::Result<TxHash> {
        let write = self.write.as_ref().ok_or(Error::NoSigner)?;
        let params = json!([{ "from": from, "to": self.contract, "data": data }]);
        let hash: String = write.request("eth_sendTransaction", params).await?;
        debug!(%from, tx = %hash, "transaction submitted");
        Ok(TxHash(hash))
    }
}

fn rejected(e: Error) -> knightfall_session::Error {
    match e {
        Error::NoSigner => knightfall_session::Error::WalletUnavailable,
        other => knightfall_session::Error::TransactionFailed(other.to_string()),
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn total_supply(&self) -> knightfall_session::Result<u64> {
        let data = self.call(abi::encode_call(selector::TOTAL_SUPPLY, &[])).await?;
        Ok(abi::decode_uint(&data)?)
    }

    async fn is_member(&self, address: &Address) -> knightfall_session::Result<bool> {
        let call = abi::encode_call(selector::IS_MEMBER, &[Token::Address(*address)]);
        Ok(abi::decode_bool(&self.call(call).await?)?)
    }

    async fn member_name(&self, address: &Address) -> knightfall_session::Result<String> {
        let call = abi::encode_call(selector::MEMBER_NAME, &[Token::Address(*address)]);
        Ok(abi::decode_string(&self.call(call).await?)?)
    }

    async fn member_category(&self, address: &Address) -> knightfall_session::Result<u64> {
        let call = abi::encode_call(selector::MEMBER_CATEGORY, &[Token::Address(*address)]);
        Ok(abi::decode_uint(&self.call(call).await?)?)
    }

    async fn token_id_for(&self, address: &Address) -> knightfall_session::Result<TokenId> {
        let call = abi::encode_call(selector::TOKEN_ID_FOR_ADDRESS, &[Token::Address(*address)]);
        Ok(TokenId(abi::decode_uint(&self.call(call).await?)?))
    }

    async fn is_whitelisted(&self, address: &Address) -> knightfall_session::Result<bool> {
        let call = abi::encode_call(selector::IS_WHITELISTED, &[Token::Address(*address)]);
        Ok(abi::decode_bool(&self.call(call).await?)?)
    }

    async fn owner_of(&self, token_id: TokenId) -> knightfall_session::Result<Address> {
        let call = abi::encode_call(selector::OWNER_OF, &[Token::Uint(token_id.0)]);
        Ok(abi::decode_address(&self.call(call).await?)?)
    }

    async fn token_uri(&self, token_id: TokenId) -> knightfall_session::Result<String> {
        let call = abi::encode_call(selector::TOKEN_URI, &[Token::Uint(token_id.0)]);
        Ok(abi::decode_string(&self.call(call).await?)?)
    }

    async fn mint_membership(
        &self,
        from: &Address,
        name: &str,
        token_uri: &str,
    ) -> knightfall_session::Result<TxHash> {
        let call = abi::encode_call(
            selector::MINT_MEMBERSHIP,
            &[Token::String(name), Token::String(token_uri)],
        );
        self.send(from, call).await.map_err(rejected)
    }

    async fn whitelist_member(
        &self,
        from: &Address,
        target: &Address,
    ) -> knightfall_session::Result<TxHash> {
        let call = abi::encode_call(selector::WHITELIST_MEMBER, &[Token::Address(*target)]);
        self.send(from, call).await.map_err(rejected)
    }

    async fn wait_for_confirmation(&self, tx: &TxHash) -> knightfall_session::Result<()> {
        loop {
            let receipt: Option<Receipt> = self
                .read
                .request("eth_getTransactionReceipt", json!([tx.0]))
                .await?;
            match receipt {
                Some(Receipt { status: Some(status) }) if status != "0x1" => {
                    return Err(knightfall_session::Error::TransactionFailed(
                        "transaction reverted".into(),
                    ));
                }
                Some(_) => {
                    info!(%tx, "transaction mined");
                    return Ok(());
                }
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}
