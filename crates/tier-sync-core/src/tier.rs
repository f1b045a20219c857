//! Price-to-group tier mapping.
//!
//! The mapping is loaded once at startup and passed explicitly to whatever
//! resolves tiers; nothing reads it from ambient state.

use serde::Deserialize;

use crate::error::SyncError;
use crate::ids::GroupId;

/// Ordered mapping from price identifier to customer group.
///
/// Lookups are exact string matches; there is no prefix, wildcard or range
/// matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierMapping {
    entries: Vec<(String, GroupId)>,
}

/// One entry of the array form of the JSON mapping.
#[derive(Debug, Deserialize)]
struct TierEntry {
    price: String,
    group: GroupValue,
}

/// Group ids arrive as numbers from JSON files and as strings from env vars.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GroupValue {
    Number(u32),
    Text(String),
}

impl GroupValue {
    fn into_group(self) -> Result<GroupId, SyncError> {
        match self {
            Self::Number(n) => Ok(GroupId::new(n)),
            Self::Text(s) => Ok(s.parse::<GroupId>()?),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TierDocument {
    Object(serde_json::Map<String, serde_json::Value>),
    List(Vec<serde_json::Value>),
}

/// An entry that was left out of a parsed mapping.
#[derive(Debug)]
pub struct RejectedTier {
    /// The price as written, or the entry position for unreadable array entries.
    pub price: String,
    /// Why it was left out.
    pub error: SyncError,
}

/// A parsed mapping together with the entries it had to leave out.
#[derive(Debug, Default)]
pub struct TierLoad {
    /// The usable entries.
    pub mapping: TierMapping,
    /// Entries whose group could not be read.
    pub rejected: Vec<RejectedTier>,
}

impl TierLoad {
    fn accept(&mut self, price: String, group: Result<GroupId, SyncError>) {
        match group {
            Ok(group) => {
                self.mapping.insert(price, group);
            }
            Err(error) => self.rejected.push(RejectedTier { price, error }),
        }
    }
}

fn invalid(reason: impl ToString) -> SyncError {
    SyncError::InvalidTierMapping {
        reason: reason.to_string(),
    }
}

impl TierMapping {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A price that is already mapped keeps its first group.
    #[must_use]
    pub fn with_entry(mut self, price: impl Into<String>, group: GroupId) -> Self {
        self.insert(price, group);
        self
    }

    /// Add an entry, returning `false` if the price was already mapped or blank.
    pub fn insert(&mut self, price: impl Into<String>, group: GroupId) -> bool {
        let price = price.into().trim().to_string();
        if price.is_empty() || self.entries.iter().any(|(p, _)| *p == price) {
            return false;
        }
        self.entries.push((price, group));
        true
    }

    /// Parse the JSON form of the mapping, keeping only usable entries.
    ///
    /// Accepts either an object (`{"price_x": 2}`) or an array
    /// (`[{"price": "price_x", "group": 2}]`). Group values may be numbers
    /// or numeric strings. Entries with any other group value are dropped;
    /// use [`TierMapping::parse_json`] to see which.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidTierMapping`] if the document has neither
    /// shape.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        Self::parse_json(json).map(|load| load.mapping)
    }

    /// Parse the JSON form of the mapping, reporting rejected entries.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidTierMapping`] if the document has neither
    /// shape.
    pub fn parse_json(json: &str) -> Result<TierLoad, SyncError> {
        let document: TierDocument = serde_json::from_str(json).map_err(invalid)?;

        let mut load = TierLoad::default();
        match document {
            TierDocument::Object(map) => {
                for (price, value) in map {
                    let group = serde_json::from_value::<GroupValue>(value)
                        .map_err(invalid)
                        .and_then(GroupValue::into_group);
                    load.accept(price, group);
                }
            }
            TierDocument::List(entries) => {
                for (index, value) in entries.into_iter().enumerate() {
                    match serde_json::from_value::<TierEntry>(value) {
                        Ok(entry) => load.accept(entry.price, entry.group.into_group()),
                        Err(e) => load.rejected.push(RejectedTier {
                            price: format!("entry {index}"),
                            error: invalid(e),
                        }),
                    }
                }
            }
        }
        Ok(load)
    }

    /// Look up one price identifier.
    #[must_use]
    pub fn group_for(&self, price: &str) -> Option<GroupId> {
        self.entries
            .iter()
            .find(|(p, _)| p == price)
            .map(|(_, group)| *group)
    }

    /// Resolve a set of purchased prices to a single group.
    ///
    /// Prices are checked in the order given (discovery order); the first
    /// one present in the mapping decides the group. An empty input or no
    /// match yields `None`.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, prices: &[S]) -> Option<GroupId> {
        prices.iter().find_map(|p| self.group_for(p.as_ref()))
    }

    /// Number of mapped prices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no price is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(price, group)` entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, GroupId)> {
        self.entries.iter().map(|(p, g)| (p.as_str(), *g))
    }
}
