//! Member rank categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank of a member, as stored by the contract's `memberCategory` table.
///
/// The contract returns a small integer; every integer outside the table maps
/// to [`Category::None`] rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    None,
    Knight,
    Commander,
    Captain,
    Oracle,
    Sentinel,
    Warrior,
}

impl Category {
    /// Every category, in contract index order.
    pub const ALL: [Category; 7] = [
        Category::None,
        Category::Knight,
        Category::Commander,
        Category::Captain,
        Category::Oracle,
        Category::Sentinel,
        Category::Warrior,
    ];

    /// Map a contract index to a category.
    pub fn from_index(index: u64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(Category::None)
    }

    /// Contract index of this category.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Display label, also used as the cached representation.
    pub fn label(self) -> &'static str {
        match self {
            Category::None => "None",
            Category::Knight => "Knight",
            Category::Commander => "Commander",
            Category::Captain => "Captain",
            Category::Oracle => "Oracle",
            Category::Sentinel => "Sentinel",
            Category::Warrior => "Warrior",
        }
    }

    /// Parse a label written by [`Category::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_seven_entries() {
        assert_eq!(Category::ALL.len(), 7);
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index() as usize, i);
            assert_eq!(Category::from_index(i as u64), *category);
        }
    }

    #[test]
    fn unknown_index_maps_to_none() {
        assert_eq!(Category::from_index(7), Category::None);
        assert_eq!(Category::from_index(9), Category::None);
        assert_eq!(Category::from_index(u64::MAX), Category::None);
        assert_eq!(Category::from_index(9).label(), "None");
    }

    #[test]
    fn labels_roundtrip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
        assert_eq!(Category::from_label("VanguardCaptain"), None);
    }
}
