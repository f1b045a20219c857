//! Per-event reconciliation.
//!
//! Each verified webhook delivery moves through
//! `Received → Verified → Normalized → Resolved → CustomerEnsured →
//! GroupApplied → Acknowledged`. Unhandled event types leave at `Verified`
//! as ignored; events without a usable email leave at `Normalized` as
//! skipped. Every directory failure ends in `Failed`.
//!
//! Nothing here holds state between deliveries. Replaying an event re-runs
//! lookup-or-create and re-applies the same group, which is safe.

use std::sync::Arc;

use serde::Serialize;
use tier_sync_core::{
    CustomerName, DirectoryCustomer, EventKind, GroupId, InboundEvent, ReconciliationResult,
    TierMapping,
};

use super::groups::GroupReconciler;
use crate::directory::{DirectoryClient, DirectoryError};
use crate::stripe::{classify, EventNormalizer, PaymentProvider, WebhookEvent};

/// Pipeline position of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Request accepted by the HTTP layer.
    Received,
    /// Signature checked.
    Verified,
    /// Reduced to an [`InboundEvent`].
    Normalized,
    /// Tier resolved (possibly to no group).
    Resolved,
    /// Directory customer found or created.
    CustomerEnsured,
    /// Group written.
    GroupApplied,
    /// Success returned to the provider.
    Acknowledged,
    /// Acknowledged without side effects.
    Ignored,
    /// Aborted; the provider will redeliver.
    Failed,
}

impl Stage {
    /// Label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Verified => "verified",
            Self::Normalized => "normalized",
            Self::Resolved => "resolved",
            Self::CustomerEnsured => "customer_ensured",
            Self::GroupApplied => "group_applied",
            Self::Acknowledged => "acknowledged",
            Self::Ignored => "ignored",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory failure, tagged with the stage that could not be reached.
#[derive(Debug, thiserror::Error)]
#[error("could not reach {stage}: {source}")]
pub struct ReconcileError {
    /// Stage being attempted.
    pub stage: Stage,
    /// Underlying failure.
    #[source]
    pub source: DirectoryError,
}

impl ReconcileError {
    fn at(stage: Stage) -> impl FnOnce(DirectoryError) -> Self {
        move |source| Self { stage, source }
    }
}

/// Why an event was acknowledged without changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No purchaser email could be resolved.
    MissingEmail,
    /// Payment failures do not revoke under the current policy.
    PaymentFailurePolicyOff,
    /// Nothing to revoke; the shopper has no directory record.
    CustomerNotFound,
}

impl SkipReason {
    /// Label used in the acknowledgment body.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingEmail => "missing_email",
            Self::PaymentFailurePolicyOff => "payment_failure_policy_off",
            Self::CustomerNotFound => "customer_not_found",
        }
    }
}

/// Successful result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The directory was updated (or confirmed) for a customer.
    Applied(ReconciliationResult),
    /// The event type is not handled.
    Ignored {
        /// Provider event type.
        event_type: String,
    },
    /// The event was handled but nothing was done.
    Skipped(SkipReason),
}

/// Sequences normalization, tier resolution, customer upsert and group
/// assignment for one event at a time.
pub struct Reconciler {
    directory: Option<Arc<DirectoryClient>>,
    payments: Option<Arc<dyn PaymentProvider>>,
    tiers: TierMapping,
    remove_on_payment_failure: bool,
}

impl Reconciler {
    /// Create a reconciler.
    ///
    /// Without `payments`, events are normalized from their payload alone.
    /// Without `directory`, every handled event fails.
    #[must_use]
    pub fn new(
        directory: Option<Arc<DirectoryClient>>,
        payments: Option<Arc<dyn PaymentProvider>>,
        tiers: TierMapping,
    ) -> Self {
        Self {
            directory,
            payments,
            tiers,
            remove_on_payment_failure: false,
        }
    }

    /// Whether `invoice.payment_failed` clears the customer's group.
    #[must_use]
    pub fn with_remove_on_payment_failure(mut self, enabled: bool) -> Self {
        self.remove_on_payment_failure = enabled;
        self
    }

    /// Handle a verified provider event.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if a directory call fails; the caller
    /// should answer 500 so the provider redelivers.
    pub async fn handle(&self, envelope: &WebhookEvent) -> Result<Outcome, ReconcileError> {
        let Some((kind, source)) = classify(envelope) else {
            tracing::debug!(
                event_id = %envelope.id,
                event_type = %envelope.event_type,
                stage = %Stage::Ignored,
                "Event type not handled"
            );
            return Ok(Outcome::Ignored {
                event_type: envelope.event_type.clone(),
            });
        };

        if kind == EventKind::PurchaseFailed && !self.remove_on_payment_failure {
            tracing::info!(
                event_id = %envelope.id,
                event_type = %envelope.event_type,
                "Payment failure left unapplied by policy"
            );
            return Ok(Outcome::Skipped(SkipReason::PaymentFailurePolicyOff));
        }

        let event = EventNormalizer::new(self.payments.as_deref())
            .normalize(envelope, kind, source)
            .await;

        self.reconcile(&event).await
    }

    /// Apply an already-normalized event to the directory.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if a directory call fails.
    pub async fn reconcile(&self, event: &InboundEvent) -> Result<Outcome, ReconcileError> {
        if event.is_ignored() {
            return Ok(Outcome::Ignored {
                event_type: event.event_type.clone(),
            });
        }

        let Some(email) = event.purchaser_email.as_deref() else {
            tracing::warn!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                stage = %Stage::Normalized,
                "No purchaser email, skipping event"
            );
            return Ok(Outcome::Skipped(SkipReason::MissingEmail));
        };

        let directory = self.directory.as_deref().ok_or_else(|| ReconcileError {
            stage: Stage::CustomerEnsured,
            source: DirectoryError::Configuration("commerce platform not configured".into()),
        })?;

        let outcome = if event.kind.grants() {
            self.grant(directory, event, email).await?
        } else {
            self.revoke(directory, event, email).await?
        };

        if let Outcome::Applied(result) = &outcome {
            tracing::info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                email = %email,
                customer_id = %result.customer_id,
                group_id = ?result.applied_group_id,
                created = result.created,
                stage = %Stage::Acknowledged,
                "Event reconciled"
            );
        }

        Ok(outcome)
    }

    async fn grant(
        &self,
        directory: &DirectoryClient,
        event: &InboundEvent,
        email: &str,
    ) -> Result<Outcome, ReconcileError> {
        let group = self.tiers.resolve(&event.price_refs);
        tracing::debug!(
            event_id = %event.event_id,
            prices = ?event.price_refs,
            group_id = ?group,
            stage = %Stage::Resolved,
            "Tier resolved"
        );

        let (customer, created, group_applied) = match directory
            .lookup_by_email(email)
            .await
            .map_err(ReconcileError::at(Stage::CustomerEnsured))?
        {
            Some(customer) => (customer, false, false),
            None => {
                let name = CustomerName::from_display_name(event.purchaser_name.as_deref());
                let created = directory
                    .create_customer(email, &name, group)
                    .await
                    .map_err(ReconcileError::at(Stage::CustomerEnsured))?;
                (created.customer, true, created.group_applied)
            }
        };

        if let Some(group) = group.filter(|_| !group_applied) {
            GroupReconciler::new(directory)
                .apply(customer.id, group)
                .await
                .map_err(ReconcileError::at(Stage::GroupApplied))?;
        }

        Ok(Outcome::Applied(ReconciliationResult {
            customer_id: customer.id,
            applied_group_id: group,
            created,
        }))
    }

    async fn revoke(
        &self,
        directory: &DirectoryClient,
        event: &InboundEvent,
        email: &str,
    ) -> Result<Outcome, ReconcileError> {
        let Some(DirectoryCustomer { id, group_id, .. }) = directory
            .lookup_by_email(email)
            .await
            .map_err(ReconcileError::at(Stage::CustomerEnsured))?
        else {
            tracing::info!(
                event_id = %event.event_id,
                email = %email,
                "No directory customer to revoke"
            );
            return Ok(Outcome::Skipped(SkipReason::CustomerNotFound));
        };

        tracing::debug!(
            event_id = %event.event_id,
            customer_id = %id,
            previous_group_id = ?group_id,
            "Clearing customer group"
        );

        GroupReconciler::new(directory)
            .apply(id, GroupId::NONE)
            .await
            .map_err(ReconcileError::at(Stage::GroupApplied))?;

        Ok(Outcome::Applied(ReconciliationResult {
            customer_id: id,
            applied_group_id: Some(GroupId::NONE),
            created: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::stripe::WebhookEventData;

    fn envelope(event_type: &str, object: serde_json::Value) -> WebhookEvent {
        WebhookEvent {
            id: "evt_1".into(),
            event_type: event_type.into(),
            data: WebhookEventData { object },
            api_version: None,
        }
    }

    fn unconfigured() -> Reconciler {
        Reconciler::new(None, None, TierMapping::new().with_entry("price_intro_m", GroupId::new(2)))
    }

    #[tokio::test]
    async fn unhandled_type_is_ignored() {
        let outcome = unconfigured()
            .handle(&envelope("charge.refunded", json!({})))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Ignored {
                event_type: "charge.refunded".into()
            }
        );
    }

    #[tokio::test]
    async fn payment_failure_is_skipped_when_policy_off() {
        let outcome = unconfigured()
            .handle(&envelope(
                "invoice.payment_failed",
                json!({"id": "in_1", "customer_email": "a@x.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::PaymentFailurePolicyOff));
    }

    #[tokio::test]
    async fn missing_email_is_skipped() {
        let outcome = unconfigured()
            .handle(&envelope(
                "invoice.paid",
                json!({"id": "in_1", "lines": {"data": [{"price": {"id": "price_intro_m"}}]}}),
            ))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::MissingEmail));
    }

    #[tokio::test]
    async fn missing_directory_fails_handled_events() {
        let err = unconfigured()
            .handle(&envelope(
                "invoice.paid",
                json!({"id": "in_1", "customer_email": "a@x.com"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::CustomerEnsured);
        assert!(matches!(err.source, DirectoryError::Configuration(_)));
    }

    #[test]
    fn stage_labels_are_snake_case() {
        assert_eq!(Stage::CustomerEnsured.to_string(), "customer_ensured");
        assert_eq!(
            serde_json::to_value(Stage::GroupApplied).unwrap(),
            json!("group_applied")
        );
    }
}
