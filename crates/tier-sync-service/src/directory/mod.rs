//! Commerce-platform customer directory.
//!
//! Customers are keyed by email and sorted into numbered groups. The
//! platform serves two API generations; see [`fallback`] for how calls move
//! between them.

pub mod client;
pub mod fallback;
pub mod types;

pub use client::{CreatedCustomer, DirectoryClient, DirectoryError};
pub use fallback::{first_success, ApiGeneration, Attempt};
pub use types::*;
