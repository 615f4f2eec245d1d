//! Wallet provider reached over JSON-RPC.

use crate::client::JsonRpcClient;
use crate::error::Error;
use async_trait::async_trait;
use knightfall_session::{Address, WalletProvider};
use serde_json::json;
use tracing::warn;

/// [`WalletProvider`] speaking `eth_accounts` / `eth_requestAccounts`.
#[derive(Debug)]
pub struct RpcWallet {
    client: JsonRpcClient,
}

impl RpcWallet {
    pub fn new(client: JsonRpcClient) -> Self {
        Self { client }
    }

    async fn accounts_via(&self, method: &str) -> knightfall_session::Result<Vec<Address>> {
        self.client
            .request(method, json!([]))
            .await
            .map_err(|e| match e {
                Error::Transport(e) => {
                    warn!(url = %self.client.url(), "wallet provider unreachable: {}", e);
                    knightfall_session::Error::WalletUnavailable
                }
                other => other.into(),
            })
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn accounts(&self) -> knightfall_session::Result<Vec<Address>> {
        self.accounts_via("eth_accounts").await
    }

    async fn request_accounts(&self) -> knightfall_session::Result<Vec<Address>> {
        self.accounts_via("eth_requestAccounts").await
    }
}
