//! Seams to the external ledger and wallet provider.
//!
//! The session never talks to a chain directly; it drives these traits.
//! `knightfall-rpc` provides JSON-RPC implementations, tests provide fakes.

use crate::error::Result;
use crate::types::{Address, TokenId, TxHash};
use async_trait::async_trait;

/// The membership contract, reachable through a read connection and a
/// write-capable connection.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// `totalSupply()`
    async fn total_supply(&self) -> Result<u64>;

    /// `isMember(address)`
    async fn is_member(&self, address: &Address) -> Result<bool>;

    /// `memberName(address)`
    async fn member_name(&self, address: &Address) -> Result<String>;

    /// `memberCategory(address)`, as the raw table index.
    async fn member_category(&self, address: &Address) -> Result<u64>;

    /// `getTokenIdForAddress(address)`
    async fn token_id_for(&self, address: &Address) -> Result<TokenId>;

    /// `isWhitelisted(address)`
    async fn is_whitelisted(&self, address: &Address) -> Result<bool>;

    /// `ownerOf(tokenId)`
    async fn owner_of(&self, token_id: TokenId) -> Result<Address>;

    /// `tokenURI(tokenId)`
    async fn token_uri(&self, token_id: TokenId) -> Result<String>;

    /// Submit `mintMembership(name, tokenURI)` signed by `from`.
    async fn mint_membership(&self, from: &Address, name: &str, token_uri: &str)
        -> Result<TxHash>;

    /// Submit `whitelistMember(target)` signed by `from`.
    async fn whitelist_member(&self, from: &Address, target: &Address) -> Result<TxHash>;

    /// Wait until a submitted transaction is mined. No timeout is applied.
    async fn wait_for_confirmation(&self, tx: &TxHash) -> Result<()>;
}

/// A wallet holding the user's accounts.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already authorized for this origin. Never prompts.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Ask the user to authorize an account.
    async fn request_accounts(&self) -> Result<Vec<Address>>;
}
