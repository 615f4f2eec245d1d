//! Knightfall Session - membership state for the Knightfall keep
//!
//! Tracks which wallet is connected and what the membership contract says it
//! owns, reconciling a local belief against the ledger.
//!
//! # Architecture
//!
//! - **Ledger**: [`Ledger`] and [`WalletProvider`] traits, the only way out to the chain
//! - **Session**: [`Session`] state machine with single-flight refresh
//! - **Cache**: address-scoped [`RestoreCache`] for provisional display state
//! - **Gate**: route decisions made on live membership only
//! - **Annotations**: [`AnnotationStore`] contract for member map pins
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use knightfall_session::{Ledger, MemoryCache, Session, WalletProvider};
//!
//! async fn run(ledger: Arc<dyn Ledger>, wallet: Arc<dyn WalletProvider>) -> knightfall_session::Result<()> {
//!     let session = Session::new(ledger, Some(wallet), Arc::new(MemoryCache::new()));
//!     session.connect().await?;
//!     let view = session.view();
//!     println!("member: {:?}", view.live_membership());
//!     Ok(())
//! }
//! ```

pub mod annotation;
pub mod cache;
pub mod category;
pub mod error;
pub mod gate;
pub mod intent;
pub mod ledger;
pub mod record;
pub mod session;
pub mod types;

pub use annotation::{Annotation, AnnotationStore, MemoryAnnotationStore};
pub use cache::{CachedSnapshot, MemoryCache, RestoreCache};
pub use category::Category;
pub use error::{Error, Result};
pub use gate::{Route, RouteDecision};
pub use intent::{IntentKind, PendingIntent};
pub use ledger::{Ledger, WalletProvider};
pub use record::MembershipRecord;
pub use session::{Phase, RefreshOutcome, Session, SessionView, VaultToken};
pub use types::{Address, TokenId, TxHash};
