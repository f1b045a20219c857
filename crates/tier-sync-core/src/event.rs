//! Normalized payment events.
//!
//! Every verified webhook delivery is reduced to one [`InboundEvent`] before
//! any reconciliation happens. The event is immutable and lives only for the
//! duration of the request.

use serde::{Deserialize, Serialize};

/// What a payment event means for the shopper's entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A subscription was purchased or renewed.
    PurchaseCompleted,
    /// A renewal payment failed.
    PurchaseFailed,
    /// The subscription ended.
    SubscriptionEnded,
    /// Not an entitlement event; acknowledged without side effects.
    Ignored,
}

impl EventKind {
    /// Whether this kind grants an entitlement.
    #[must_use]
    pub const fn grants(self) -> bool {
        matches!(self, Self::PurchaseCompleted)
    }

    /// Whether this kind can revoke an entitlement.
    #[must_use]
    pub const fn revokes(self) -> bool {
        matches!(self, Self::PurchaseFailed | Self::SubscriptionEnded)
    }

    /// Stable lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PurchaseCompleted => "purchase_completed",
            Self::PurchaseFailed => "purchase_failed",
            Self::SubscriptionEnded => "subscription_ended",
            Self::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment event reduced to the fields reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Provider event identifier (for logs only).
    pub event_id: String,
    /// Provider event type string, e.g. `invoice.paid`.
    pub event_type: String,
    /// Entitlement meaning of the event.
    pub kind: EventKind,
    /// Price identifiers in discovery order, without duplicates.
    pub price_refs: Vec<String>,
    /// Purchaser email, already trimmed and lowercased.
    pub purchaser_email: Option<String>,
    /// Purchaser display name as given by the provider.
    pub purchaser_name: Option<String>,
}

impl InboundEvent {
    /// Create an event with no resolved data yet.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        kind: EventKind,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            kind,
            price_refs: Vec::new(),
            purchaser_email: None,
            purchaser_name: None,
        }
    }

    /// Create an event that will not be processed further.
    #[must_use]
    pub fn ignored(event_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self::new(event_id, event_type, EventKind::Ignored)
    }

    /// Whether the event requires no further processing.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.kind == EventKind::Ignored
    }

    /// Record a price identifier, keeping first-discovery order.
    ///
    /// Blank identifiers and repeats are dropped.
    pub fn push_price_ref(&mut self, price: impl Into<String>) {
        let price = price.into();
        let price = price.trim();
        if price.is_empty() || self.price_refs.iter().any(|p| p == price) {
            return;
        }
        self.price_refs.push(price.to_string());
    }

    /// Set the purchaser email if none is known yet.
    ///
    /// Returns `true` when the value was accepted.
    pub fn offer_email(&mut self, email: Option<&str>) -> bool {
        if self.purchaser_email.is_some() {
            return false;
        }
        match email.and_then(normalize_email) {
            Some(email) => {
                self.purchaser_email = Some(email);
                true
            }
            None => false,
        }
    }

    /// Set the purchaser name if none is known yet.
    pub fn offer_name(&mut self, name: Option<&str>) {
        if self.purchaser_name.is_some() {
            return;
        }
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            self.purchaser_name = Some(name.to_string());
        }
    }
}

/// Normalize an email for use as a case-insensitive key.
///
/// Returns `None` for blank input or input without an `@`.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    Some(email.to_lowercase())
}
