//! Error types for tier-sync.

use crate::ids::IdError;

/// Result type for tier-sync core operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised by the core domain types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The tier mapping document could not be used.
    #[error("invalid tier mapping: {reason}")]
    InvalidTierMapping {
        /// What was wrong with it.
        reason: String,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
