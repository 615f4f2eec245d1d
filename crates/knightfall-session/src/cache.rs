//! Restore cache for membership snapshots.
//!
//! The cache only ever paints provisional state. Every entry is scoped by
//! address; the legacy unscoped `isMember` key is never read and is purged
//! when a session is built.
//!
//! # Keys
//!
//! - `account` - last address a snapshot was written for
//! - `isMember_<address>` - JSON boolean
//! - `tokenId_<address>` - decimal string
//! - `memberCategory_<address>` - category label

use crate::category::Category;
use crate::error::{Error, Result};
use crate::record::MembershipRecord;
use crate::types::{Address, TokenId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

/// Key of the last address a snapshot was stored for.
pub const ACCOUNT_KEY: &str = "account";

/// Unscoped membership flag written by older front-ends.
pub const LEGACY_IS_MEMBER_KEY: &str = "isMember";

fn is_member_key(address: &Address) -> String {
    format!("isMember_{}", address)
}

fn token_id_key(address: &Address) -> String {
    format!("tokenId_{}", address)
}

fn category_key(address: &Address) -> String {
    format!("memberCategory_{}", address)
}

/// String key-value storage that survives restarts.
pub trait RestoreCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn put(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process cache, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RestoreCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Cache("memory cache poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Cache("memory cache poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Cache("memory cache poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Last known membership of one address. Never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSnapshot {
    pub address: Address,
    pub is_member: bool,
    pub token_id: Option<TokenId>,
    pub category: Option<Category>,
}

impl CachedSnapshot {
    /// Snapshot of a live record.
    pub fn from_record(record: &MembershipRecord) -> Self {
        Self {
            address: record.address(),
            is_member: record.is_member(),
            token_id: record.token_id(),
            category: record.category(),
        }
    }

    /// Load the snapshot stored for `address`, if any.
    ///
    /// Unparseable token ids or category labels are dropped rather than
    /// failing the load.
    pub fn load(cache: &dyn RestoreCache, address: &Address) -> Result<Option<Self>> {
        let Some(flag) = cache.get(&is_member_key(address))? else {
            return Ok(None);
        };
        let is_member: bool = serde_json::from_str(&flag)?;
        if !is_member {
            return Ok(Some(Self {
                address: *address,
                is_member,
                token_id: None,
                category: None,
            }));
        }

        let token_id = match cache.get(&token_id_key(address))? {
            Some(raw) => match raw.parse::<TokenId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(%address, "ignoring cached token id: {}", e);
                    None
                }
            },
            None => None,
        };
        let category = cache
            .get(&category_key(address))?
            .and_then(|label| Category::from_label(&label));

        Ok(Some(Self {
            address: *address,
            is_member,
            token_id,
            category,
        }))
    }

    /// Load the snapshot of the last address one was stored for.
    pub fn load_last(cache: &dyn RestoreCache) -> Result<Option<Self>> {
        let Some(raw) = cache.get(ACCOUNT_KEY)? else {
            return Ok(None);
        };
        match raw.parse::<Address>() {
            Ok(address) => Self::load(cache, &address),
            Err(e) => {
                warn!("ignoring cached account: {}", e);
                Ok(None)
            }
        }
    }

    /// Persist this snapshot, replacing whatever was stored for its address.
    pub fn store(&self, cache: &dyn RestoreCache) -> Result<()> {
        let address = &self.address;
        cache.put(ACCOUNT_KEY, &address.to_string())?;
        cache.put(&is_member_key(address), &serde_json::to_string(&self.is_member)?)?;
        match self.token_id {
            Some(id) => cache.put(&token_id_key(address), &id.to_string())?,
            None => cache.remove(&token_id_key(address))?,
        }
        match self.category {
            Some(category) => cache.put(&category_key(address), category.label())?,
            None => cache.remove(&category_key(address))?,
        }
        Ok(())
    }
}

/// Drop the legacy unscoped membership flag.
pub fn purge_legacy(cache: &dyn RestoreCache) -> Result<()> {
    cache.remove(LEGACY_IS_MEMBER_KEY)
}
