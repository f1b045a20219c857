//! Tier-sync HTTP service.
//!
//! This crate receives Stripe webhooks and keeps commerce-platform customer
//! groups in line with what each shopper has paid for:
//!
//! - Webhook signature verification and event normalization ([`stripe`])
//! - Customer lookup and creation across two platform API generations
//!   ([`directory`])
//! - Group assignment and per-event orchestration ([`reconcile`])
//! - Catalog and signed media relays ([`handlers`])

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Health handler is async for routing

pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod reconcile;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::ServiceConfig;
pub use directory::{DirectoryClient, DirectoryError};
pub use error::ApiError;
pub use reconcile::{Outcome, ReconcileError, Reconciler};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
