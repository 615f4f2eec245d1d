//! Keep Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with one RocksDB storage shared by the session
//!   restore cache and the member map
//! - One membership session against the configured contract
//! - HTTP API for presentation clients

use crate::api;
use crate::error::{Error, Result};
use crate::storage::Storage;
use knightfall_rpc::{JsonRpcClient, RpcLedger, RpcWallet};
use knightfall_session::{Address, Ledger, Session, WalletProvider};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Membership contract on Sepolia.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x43Db45EFcb7B28cA004728e74F6Ca880d5F31C39";

/// Configuration for a Keep node.
#[derive(Debug, Clone)]
pub struct KeepConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// JSON-RPC endpoint for contract reads
    pub read_rpc_url: String,

    /// JSON-RPC endpoint of the wallet provider, which also signs writes
    pub wallet_rpc_url: Option<String>,

    /// Membership contract
    pub contract: Address,

    /// Interval between transaction receipt polls
    pub confirmation_poll: Duration,
}

impl KeepConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir =
            PathBuf::from(lookup("KEEP_DATA_DIR").unwrap_or_else(|| "./keep-data".to_string()));

        let api_addr = lookup("KEEP_API_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| Error::Config(format!("invalid KEEP_API_ADDR: {}", e)))?;

        let read_rpc_url = lookup("KEEP_READ_RPC_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::Config("KEEP_READ_RPC_URL is required".to_string()))?;

        let wallet_rpc_url = lookup("KEEP_WALLET_RPC_URL").filter(|url| !url.trim().is_empty());

        let contract = lookup("KEEP_CONTRACT_ADDRESS")
            .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string())
            .parse()
            .map_err(|e| Error::Config(format!("invalid KEEP_CONTRACT_ADDRESS: {}", e)))?;

        let poll_ms: u64 = lookup("KEEP_CONFIRMATION_POLL_MS")
            .unwrap_or_else(|| "1000".to_string())
            .parse()
            .map_err(|e| Error::Config(format!("invalid KEEP_CONFIRMATION_POLL_MS: {}", e)))?;

        Ok(Self {
            data_dir,
            api_addr,
            read_rpc_url,
            wallet_rpc_url,
            contract,
            confirmation_poll: Duration::from_millis(poll_ms),
        })
    }
}

/// Shared state for the Keep node.
pub struct KeepState {
    pub session: Arc<Session>,
    pub storage: Arc<Storage>,
}

/// A Keep node instance.
pub struct KeepNode {
    state: Arc<KeepState>,
    config: KeepConfig,
}

impl KeepNode {
    /// Create a new Keep node wired to the configured JSON-RPC endpoints.
    pub async fn new(config: KeepConfig) -> Result<Self> {
        let read = JsonRpcClient::new(config.read_rpc_url.clone());
        let mut ledger =
            RpcLedger::new(read, config.contract).with_poll_interval(config.confirmation_poll);

        let wallet: Option<Arc<dyn WalletProvider>> = match &config.wallet_rpc_url {
            Some(url) => {
                ledger = ledger.with_signer(JsonRpcClient::new(url.clone()));
                Some(Arc::new(RpcWallet::new(JsonRpcClient::new(url.clone()))))
            }
            None => {
                tracing::warn!("KEEP_WALLET_RPC_URL not set, running without a wallet provider");
                None
            }
        };

        Self::with_ledger(config, Arc::new(ledger), wallet)
    }

    /// Create a node around an existing ledger and wallet.
    pub fn with_ledger(
        config: KeepConfig,
        ledger: Arc<dyn Ledger>,
        wallet: Option<Arc<dyn WalletProvider>>,
    ) -> Result<Self> {
        // Ensure data directory exists
        std::fs::create_dir_all(&config.data_dir)?;

        let storage = Arc::new(Storage::open(&config.data_dir)?);
        let session = Arc::new(Session::new(ledger, wallet, storage.clone()));

        let state = Arc::new(KeepState { session, storage });

        Ok(Self { state, config })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<KeepState> {
        Arc::clone(&self.state)
    }

    /// Run the node (connects the session and starts the HTTP server).
    pub async fn run(self) -> Result<()> {
        tracing::info!("Keep node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Ledger: {}", self.config.read_rpc_url);
        tracing::info!("  Contract: {}", self.config.contract);
        tracing::info!("  Data: {:?}", self.config.data_dir);

        // Connect in the background; clients watch the phase move.
        let session = Arc::clone(&self.state.session);
        tokio::spawn(async move {
            if let Err(e) = session.connect().await {
                tracing::warn!("Initial connect failed: {}", e);
            }
        });

        let app = api::build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
