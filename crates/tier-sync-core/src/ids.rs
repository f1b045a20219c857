//! Identifier types for tier-sync.
//!
//! Both identifiers are numeric and owned by the commerce platform. They are
//! wrapped in newtypes so a customer id can never be passed where a group id
//! is expected.
//!
//! # Macro-based ID Types
//!
//! The `numeric_id_type!` macro generates the shared boilerplate: transparent
//! serde (the wire form is a bare JSON number), parsing, and display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to define a numeric identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around an unsigned integer with
/// implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (as a bare number)
/// - `FromStr`, `Display`, `Debug`
/// - `From<inner>` and `From<Self> for inner`
macro_rules! numeric_id_type {
    ($name:ident, $inner:ty, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Create an identifier from its raw value.
            #[must_use]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Return the raw value.
            #[must_use]
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<$inner>()
                    .map(Self)
                    .map_err(|_| IdError::NotNumeric(s.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id_type!(
    GroupId,
    u32,
    "A commerce-platform customer group.\n\n\
     Group `0` is the platform's \"no group\" sentinel; see [`GroupId::NONE`]."
);
numeric_id_type!(
    CustomerId,
    u64,
    "A commerce-platform customer record identifier."
);

impl GroupId {
    /// The "no group" sentinel. Assigning it is how membership is revoked.
    pub const NONE: Self = Self(0);

    /// Whether this is the "no group" sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not an unsigned integer.
    #[error("identifier is not numeric: {0:?}")]
    NotNumeric(String),
}
