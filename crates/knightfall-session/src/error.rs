//! Error types for the membership session.

use thiserror::Error;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a membership session.
#[derive(Debug, Error)]
pub enum Error {
    /// No wallet provider is present. Fatal for the session.
    #[error("no wallet provider available")]
    WalletUnavailable,

    /// The user rejected the authorization prompt. Retry by connecting again.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// One optional membership field could not be fetched.
    #[error("failed to fetch {field}: {reason}")]
    FieldFetchFailed {
        field: &'static str,
        reason: String,
    },

    /// A mint or whitelist transaction was rejected or reverted.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// A fetch finished for an address or epoch that is no longer current.
    #[error("stale response discarded")]
    StaleResponseDiscarded,

    /// An intent of the same kind is still outstanding.
    #[error("a {0} request is already in flight")]
    IntentInFlight(&'static str),

    /// The operation needs a connected, ready session.
    #[error("session is not connected")]
    NotConnected,

    /// Token id, name or category is missing from the live record.
    #[error("missing member data: token id, name and category are required")]
    MissingMemberData,

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Ledger call failed.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Restore cache error
    #[error("cache error: {0}")]
    Cache(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
