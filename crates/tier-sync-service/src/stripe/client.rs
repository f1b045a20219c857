//! Stripe API client implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::types::{Customer, StripeErrorResponse};

/// Stripe API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1";

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {status} {error_type} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Resource lookups the event normalizer needs from the payment provider.
///
/// Sessions and invoices come back as raw JSON so the normalizer can try
/// several field paths; customers are typed.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Retrieve a checkout session with its line items expanded.
    async fn checkout_session(&self, session_id: &str) -> Result<serde_json::Value, StripeError>;

    /// Retrieve an invoice, including its first page of lines.
    async fn invoice(&self, invoice_id: &str) -> Result<serde_json::Value, StripeError>;

    /// Retrieve a customer.
    async fn customer(&self, customer_id: &str) -> Result<Customer, StripeError>;
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StripeClient {
    /// Create a new Stripe client against the public API.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    ///
    /// # Errors
    ///
    /// Returns [`StripeError::Configuration`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, StripeError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL (mock servers, proxies).
    ///
    /// # Errors
    ///
    /// Returns [`StripeError::Configuration`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StripeError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StripeError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .query(query)
            .send()
            .await?;

        handle_response(response).await
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn checkout_session(&self, session_id: &str) -> Result<serde_json::Value, StripeError> {
        self.get(
            &format!("checkout/sessions/{session_id}"),
            &[("expand[]", "line_items")],
        )
        .await
    }

    async fn invoice(&self, invoice_id: &str) -> Result<serde_json::Value, StripeError> {
        self.get(&format!("invoices/{invoice_id}"), &[]).await
    }

    async fn customer(&self, customer_id: &str) -> Result<Customer, StripeError> {
        self.get(&format!("customers/{customer_id}"), &[]).await
    }
}

/// Handle API response and convert errors.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StripeError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    // Try to parse error response
    let error_body: Result<StripeErrorResponse, _> = response.json().await;

    match error_body {
        Ok(stripe_error) => Err(StripeError::Api {
            status: status.as_u16(),
            error_type: stripe_error.error.error_type,
            message: stripe_error.error.message,
            code: stripe_error.error.code,
        }),
        Err(_) => Err(StripeError::Api {
            status: status.as_u16(),
            error_type: "unknown".to_string(),
            message: format!("HTTP {status}"),
            code: None,
        }),
    }
}
