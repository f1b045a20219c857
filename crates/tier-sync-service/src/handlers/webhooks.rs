//! Stripe webhook handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::reconcile::Outcome;
use crate::state::AppState;
use crate::stripe::signature::{self, SignatureError, SIGNATURE_HEADER};
use crate::stripe::WebhookEvent;

/// Webhook acknowledgment.
///
/// Every non-error outcome is `ok: true` so Stripe does not redeliver.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always `true` on a 200.
    pub ok: bool,
    /// Event type, when the event type is not handled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<String>,
    /// Reason, when a handled event needed no change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<&'static str>,
}

impl WebhookAck {
    /// Acknowledgment for a verified body that is not an event.
    #[must_use]
    pub fn unparseable() -> Self {
        Self {
            ok: true,
            ignored: None,
            skipped: Some("unparseable"),
        }
    }
}

impl From<Outcome> for WebhookAck {
    fn from(outcome: Outcome) -> Self {
        let mut ack = Self {
            ok: true,
            ignored: None,
            skipped: None,
        };
        match outcome {
            Outcome::Applied(_) => {}
            Outcome::Ignored { event_type } => ack.ignored = Some(event_type),
            Outcome::Skipped(reason) => ack.skipped = Some(reason.as_str()),
        }
        ack
    }
}

/// Handle Stripe webhooks.
///
/// The body is taken as raw bytes and only parsed after the signature over
/// those exact bytes has been verified.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    verify_delivery(&state, &body, header).map_err(|e| {
        tracing::warn!(error = %e, "Rejected Stripe webhook");
        ApiError::from(e)
    })?;

    // Redelivery cannot fix a signed body that is not an event.
    let envelope: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Signed webhook is not a Stripe event, skipping");
            return Ok(Json(WebhookAck::unparseable()));
        }
    };

    tracing::info!(
        event_type = %envelope.event_type,
        event_id = %envelope.id,
        api_version = envelope.api_version.as_deref().unwrap_or("unknown"),
        "Received Stripe webhook"
    );

    let outcome = state.reconciler.handle(&envelope).await.map_err(|e| {
        tracing::warn!(event_id = %envelope.id, stage = %e.stage, "Reconciliation failed");
        ApiError::from(e)
    })?;

    Ok(Json(WebhookAck::from(outcome)))
}

fn verify_delivery(
    state: &AppState,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or(SignatureError::NotConfigured)?;
    let header = header.ok_or(SignatureError::MissingHeader)?;

    signature::verify(
        body,
        header,
        secret,
        state.config.signature_tolerance_seconds,
    )
}
