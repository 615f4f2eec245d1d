//! User-initiated mutating requests.

use crate::error::{Error, Result};
use crate::types::{Address, TxHash};

/// The two kinds of write the session can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Mint,
    Whitelist,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::Mint => "mint",
            IntentKind::Whitelist => "whitelist",
        }
    }
}

/// A mutating request waiting on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingIntent {
    Mint { name: String, token_uri: String },
    Whitelist { target: Address },
}

impl PendingIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            PendingIntent::Mint { .. } => IntentKind::Mint,
            PendingIntent::Whitelist { .. } => IntentKind::Whitelist,
        }
    }

    /// Reject requests the ledger would only fail on.
    pub fn validate(&self) -> Result<()> {
        match self {
            PendingIntent::Mint { name, token_uri } => {
                if name.trim().is_empty() {
                    return Err(Error::InvalidInput("mint name is empty".into()));
                }
                if token_uri.trim().is_empty() {
                    return Err(Error::InvalidInput("token URI is empty".into()));
                }
                Ok(())
            }
            PendingIntent::Whitelist { .. } => Ok(()),
        }
    }

    pub(crate) fn submitted_status(&self, tx: &TxHash) -> String {
        match self {
            PendingIntent::Mint { .. } => format!("Minting... Transaction Hash: {tx}"),
            PendingIntent::Whitelist { .. } => format!("Whitelisting... Transaction Hash: {tx}"),
        }
    }

    pub(crate) fn confirmed_status(&self) -> String {
        match self {
            PendingIntent::Mint { name, .. } => format!("Successfully minted NFT for {name}"),
            PendingIntent::Whitelist { target } => format!("Successfully whitelisted {target}"),
        }
    }

    pub(crate) fn failed_status(&self, reason: &str) -> String {
        match self {
            PendingIntent::Mint { .. } => format!("Error minting: {reason}"),
            PendingIntent::Whitelist { .. } => format!("Error whitelisting: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_requires_name_and_uri() {
        let empty_name = PendingIntent::Mint {
            name: " ".into(),
            token_uri: "ipfs://x".into(),
        };
        assert!(matches!(empty_name.validate(), Err(Error::InvalidInput(_))));

        let ok = PendingIntent::Mint {
            name: "Galahad".into(),
            token_uri: "ipfs://x".into(),
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.kind(), IntentKind::Mint);
    }

    #[test]
    fn status_strings() {
        let intent = PendingIntent::Mint {
            name: "Galahad".into(),
            token_uri: "ipfs://x".into(),
        };
        let tx = TxHash("0xfeed".into());
        assert_eq!(intent.submitted_status(&tx), "Minting... Transaction Hash: 0xfeed");
        assert_eq!(intent.confirmed_status(), "Successfully minted NFT for Galahad");
        assert_eq!(intent.failed_status("reverted"), "Error minting: reverted");
    }
}
