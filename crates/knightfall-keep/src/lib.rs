//! Knightfall Keep - membership session daemon
//!
//! Runs one membership session against the Knightfall contract and serves it
//! to presentation clients over HTTP.
//!
//! # Architecture
//!
//! - **Storage**: RocksDB-backed restore cache and member map
//! - **Node**: configuration and wiring of ledger, wallet and session
//! - **API**: HTTP endpoints for session state, intents and route gating
//!
//! # Example
//!
//! ```no_run
//! use knightfall_keep::{KeepConfig, KeepNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = KeepConfig::from_env()?;
//!     let node = KeepNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod node;
pub mod storage;

pub use error::{Error, Result};
pub use node::{KeepConfig, KeepNode, KeepState};
pub use storage::Storage;
