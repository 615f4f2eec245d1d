//! Knightfall RPC - Ethereum JSON-RPC implementations of the session seams
//!
//! - [`RpcLedger`]: the membership contract, read over `eth_call` and written
//!   over `eth_sendTransaction`
//! - [`RpcWallet`]: a wallet provider exposing `eth_accounts` and
//!   `eth_requestAccounts`
//! - [`abi`]: the small ABI codec the contract needs
//!
//! # Example
//!
//! ```no_run
//! use knightfall_rpc::{JsonRpcClient, RpcLedger, RpcWallet};
//!
//! let contract = "0x43Db45EFcb7B28cA004728e74F6Ca880d5F31C39".parse().unwrap();
//! let ledger = RpcLedger::new(JsonRpcClient::new("https://rpc.sepolia.org"), contract)
//!     .with_signer(JsonRpcClient::new("http://127.0.0.1:8545"));
//! let wallet = RpcWallet::new(JsonRpcClient::new("http://127.0.0.1:8545"));
//! ```

pub mod abi;
pub mod client;
pub mod error;
pub mod ledger;
pub mod wallet;

pub use client::JsonRpcClient;
pub use error::{Error, Result};
pub use ledger::RpcLedger;
pub use wallet::RpcWallet;
