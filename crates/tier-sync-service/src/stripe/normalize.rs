//! Reduce Stripe webhook payloads to [`InboundEvent`]s.
//!
//! Price identifiers and purchaser details are read through prioritized lists
//! of field-path extractors over loose JSON. Stripe has moved the price id
//! between API versions; each extractor handles one known location and the
//! first non-empty result wins.
//!
//! Sub-lookups (session, invoice, customer) are best-effort: a failure is
//! logged and normalization continues with whatever was already resolved.

use serde_json::Value;
use tier_sync_core::{EventKind, InboundEvent};

use super::client::PaymentProvider;
use super::types::WebhookEvent;

/// Which provider object an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// `data.object` is a checkout session.
    CheckoutSession,
    /// `data.object` is an invoice.
    Invoice,
    /// `data.object` is a subscription.
    Subscription,
}

/// Reads one optional value out of a JSON object.
pub type Extractor = fn(&Value) -> Option<&str>;

/// Price-id locations on a line item, most specific first.
pub const PRICE_EXTRACTORS: &[(&str, Extractor)] = &[
    ("price.id", price_object_id),
    ("price", price_string),
    ("pricing.price_details.price", pricing_details_price),
    ("plan.id", plan_object_id),
    ("plan", plan_string),
];

fn price_object_id(item: &Value) -> Option<&str> {
    str_at(item, &["price", "id"])
}

fn price_string(item: &Value) -> Option<&str> {
    str_at(item, &["price"])
}

fn pricing_details_price(item: &Value) -> Option<&str> {
    str_at(item, &["pricing", "price_details", "price"])
}

fn plan_object_id(item: &Value) -> Option<&str> {
    str_at(item, &["plan", "id"])
}

fn plan_string(item: &Value) -> Option<&str> {
    str_at(item, &["plan"])
}

/// Map a provider event to its entitlement kind and payload shape.
///
/// Returns `None` for every event type the reconciler does not handle, and
/// for checkout sessions that completed without payment (the async payment
/// success event follows later).
#[must_use]
pub fn classify(event: &WebhookEvent) -> Option<(EventKind, EventSource)> {
    let classified = match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            (EventKind::PurchaseCompleted, EventSource::CheckoutSession)
        }
        "invoice.paid" | "invoice.payment_succeeded" => {
            (EventKind::PurchaseCompleted, EventSource::Invoice)
        }
        "invoice.payment_failed" => (EventKind::PurchaseFailed, EventSource::Invoice),
        "customer.subscription.deleted" => {
            (EventKind::SubscriptionEnded, EventSource::Subscription)
        }
        _ => return None,
    };

    if classified.1 == EventSource::CheckoutSession
        && str_at(&event.data.object, &["payment_status"]) == Some("unpaid")
    {
        return None;
    }

    Some(classified)
}

/// Return the first value produced by `extractors`, in order.
#[must_use]
pub fn first_present<'a>(item: &'a Value, extractors: &[(&str, Extractor)]) -> Option<&'a str> {
    extractors.iter().find_map(|(_, extract)| extract(item))
}

/// Builds [`InboundEvent`]s, optionally consulting the payment provider.
pub struct EventNormalizer<'a> {
    payments: Option<&'a dyn PaymentProvider>,
}

impl<'a> EventNormalizer<'a> {
    /// Create a normalizer. Without a provider, only the event payload is used.
    #[must_use]
    pub fn new(payments: Option<&'a dyn PaymentProvider>) -> Self {
        Self { payments }
    }

    /// Normalize an event already classified as `kind`/`source`.
    pub async fn normalize(
        &self,
        envelope: &WebhookEvent,
        kind: EventKind,
        source: EventSource,
    ) -> InboundEvent {
        let mut event = InboundEvent::new(&envelope.id, &envelope.event_type, kind);
        let object = &envelope.data.object;

        match source {
            EventSource::CheckoutSession => self.from_checkout_session(object, &mut event).await,
            EventSource::Invoice => self.from_invoice(object, &mut event).await,
            EventSource::Subscription => self.fill_from_customer(object, &mut event).await,
        }

        tracing::debug!(
            event_id = %event.event_id,
            kind = %event.kind,
            prices = ?event.price_refs,
            has_email = event.purchaser_email.is_some(),
            "Normalized payment event"
        );

        event
    }

    async fn from_checkout_session(&self, object: &Value, event: &mut InboundEvent) {
        let retrieved = match (self.payments, str_at(object, &["id"])) {
            (Some(payments), Some(session_id)) => match payments.checkout_session(session_id).await
            {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        session_id = %session_id,
                        error = %e,
                        "Checkout session lookup failed, using event payload"
                    );
                    None
                }
            },
            _ => None,
        };

        let sources: Vec<&Value> = std::iter::once(object).chain(retrieved.as_ref()).collect();

        for source in &sources {
            harvest_prices(event, line_items(source, "line_items"));
        }

        for path in [
            &["customer_details", "email"][..],
            &["customer_email"][..],
            &["customer", "email"][..],
        ] {
            for source in &sources {
                event.offer_email(str_at(source, path));
            }
        }
        for source in &sources {
            event.offer_name(str_at(source, &["customer_details", "name"]));
        }

        let customer_source = retrieved.as_ref().unwrap_or(object);
        self.fill_from_customer(customer_source, event).await;
    }

    async fn from_invoice(&self, object: &Value, event: &mut InboundEvent) {
        harvest_prices(event, line_items(object, "lines"));

        if event.price_refs.is_empty() {
            if let (Some(payments), Some(invoice_id)) = (self.payments, str_at(object, &["id"])) {
                match payments.invoice(invoice_id).await {
                    Ok(invoice) => harvest_prices(event, line_items(&invoice, "lines")),
                    Err(e) => tracing::warn!(
                        event_id = %event.event_id,
                        invoice_id = %invoice_id,
                        error = %e,
                        "Invoice lookup failed, continuing without prices"
                    ),
                }
            }
        }

        event.offer_email(str_at(object, &["customer_email"]));
        event.offer_email(str_at(object, &["customer", "email"]));
        event.offer_name(str_at(object, &["customer_name"]));

        self.fill_from_customer(object, event).await;
    }

    /// Fill missing email/name from the object's customer reference.
    async fn fill_from_customer(&self, object: &Value, event: &mut InboundEvent) {
        if event.purchaser_email.is_some() && event.purchaser_name.is_some() {
            return;
        }

        // Expanded customer objects already carry the fields.
        event.offer_email(str_at(object, &["customer", "email"]));
        event.offer_name(str_at(object, &["customer", "name"]));
        if event.purchaser_email.is_some() && event.purchaser_name.is_some() {
            return;
        }

        let Some(customer_id) =
            str_at(object, &["customer"]).or_else(|| str_at(object, &["customer", "id"]))
        else {
            return;
        };
        let Some(payments) = self.payments else {
            tracing::debug!(
                event_id = %event.event_id,
                "Payment provider not configured, skipping customer lookup"
            );
            return;
        };

        match payments.customer(customer_id).await {
            Ok(customer) if customer.deleted => {
                tracing::info!(
                    event_id = %event.event_id,
                    customer = %customer_id,
                    "Stripe customer was deleted"
                );
            }
            Ok(customer) => {
                event.offer_email(customer.email.as_deref());
                event.offer_name(customer.name.as_deref());
            }
            Err(e) => tracing::warn!(
                event_id = %event.event_id,
                customer = %customer_id,
                error = %e,
                "Customer lookup failed"
            ),
        }
    }
}

fn harvest_prices(event: &mut InboundEvent, items: &[Value]) {
    for item in items {
        if let Some(price) = first_present(item, PRICE_EXTRACTORS) {
            event.push_price_ref(price);
        }
    }
}

fn line_items<'a>(object: &'a Value, collection: &str) -> &'a [Value] {
    object
        .get(collection)
        .and_then(|c| c.get("data"))
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Follow `path` through nested objects to a non-blank string.
fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().filter(|s| !s.trim().is_empty())
}
