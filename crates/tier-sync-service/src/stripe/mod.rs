//! Stripe integration: webhook verification, resource lookups and event
//! normalization.
//!
//! Stripe handles:
//! - Signing webhook deliveries (verified in [`signature`])
//! - Serving checkout sessions, invoices and customers (via [`StripeClient`])
//! - Describing purchases, renewals and cancellations (see [`normalize`])

pub mod client;
pub mod normalize;
pub mod signature;
pub mod types;

pub use client::{PaymentProvider, StripeClient, StripeError};
pub use normalize::{classify, EventNormalizer, EventSource};
pub use signature::SignatureError;
pub use types::*;
