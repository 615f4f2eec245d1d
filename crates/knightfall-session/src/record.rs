//! Membership records derived from the ledger.

use crate::category::Category;
use crate::types::{Address, TokenId};
use serde::Serialize;

/// What the ledger says about one address.
///
/// Fields are private so a non-member record can never carry a name,
/// category or token id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    address: Address,
    is_member: bool,
    name: Option<String>,
    category: Option<Category>,
    token_id: Option<TokenId>,
}

impl MembershipRecord {
    /// Record for an address that holds no membership.
    pub fn non_member(address: Address) -> Self {
        Self {
            address,
            is_member: false,
            name: None,
            category: None,
            token_id: None,
        }
    }

    /// Record for a member. Any field whose fetch failed is `None`.
    pub fn member(
        address: Address,
        name: Option<String>,
        category: Option<Category>,
        token_id: Option<TokenId>,
    ) -> Self {
        Self {
            address,
            is_member: true,
            name,
            category,
            token_id,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_member(&self) -> bool {
        self.is_member
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn token_id(&self) -> Option<TokenId> {
        self.token_id
    }
}
