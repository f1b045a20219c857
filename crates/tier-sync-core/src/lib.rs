//! Core types for tier-sync.
//!
//! This crate holds the I/O-free vocabulary of the reconciliation pipeline:
//!
//! - **Identifiers**: `GroupId` (with the `NONE` sentinel), `CustomerId`
//! - **Events**: `EventKind`, `InboundEvent`
//! - **Tiers**: `TierMapping`, first-match price resolution
//! - **Customers**: `DirectoryCustomer`, `CustomerName`, `ReconciliationResult`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod customer;
pub mod error;
pub mod event;
pub mod ids;
pub mod tier;

pub use customer::{
    CustomerName, DirectoryCustomer, ReconciliationResult, PLACEHOLDER_FIRST_NAME,
    PLACEHOLDER_LAST_NAME,
};
pub use error::{Result, SyncError};
pub use event::{normalize_email, EventKind, InboundEvent};
pub use ids::{CustomerId, GroupId, IdError};
pub use tier::{RejectedTier, TierLoad, TierMapping};
