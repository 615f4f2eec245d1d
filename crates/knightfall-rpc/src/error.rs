//! Error types for knightfall-rpc.

use thiserror::Error;

/// Result type for knightfall-rpc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// EIP-1193 code for a request the user rejected.
pub const USER_REJECTED: i64 = 4001;

/// Errors that can occur talking to a JSON-RPC endpoint.
#[derive(Debug, Error)]
pub enum Error {
    /// The endpoint could not be reached.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("{message} (code {code})")]
    Rpc { code: i64, message: String },

    /// The response did not match the JSON-RPC envelope.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Return data could not be decoded against the ABI.
    #[error("ABI decoding error: {0}")]
    Abi(String),

    /// Hex decoding error
    #[error("hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A write was attempted without a wallet endpoint.
    #[error("no wallet endpoint configured")]
    NoSigner,
}

impl From<Error> for knightfall_session::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Rpc {
                code: USER_REJECTED,
                message,
            } => knightfall_session::Error::AuthorizationDenied(message),
            Error::NoSigner => knightfall_session::Error::WalletUnavailable,
            other => knightfall_session::Error::Ledger(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_rejection_maps_to_authorization_denied() {
        let err: knightfall_session::Error = Error::Rpc {
            code: USER_REJECTED,
            message: "User rejected the request.".into(),
        }
        .into();
        assert!(matches!(err, knightfall_session::Error::AuthorizationDenied(m) if m.contains("rejected")));
    }

    #[test]
    fn other_rpc_errors_map_to_ledger() {
        let err: knightfall_session::Error = Error::Rpc {
            code: -32000,
            message: "execution reverted".into(),
        }
        .into();
        assert!(matches!(err, knightfall_session::Error::Ledger(_)));
    }
}
