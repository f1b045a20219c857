//! Application state.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::directory::DirectoryClient;
use crate::reconcile::Reconciler;
use crate::stripe::{PaymentProvider, StripeClient};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: ServiceConfig,

    /// Webhook reconciler.
    pub reconciler: Arc<Reconciler>,

    /// Stripe client for sub-lookups (optional).
    pub stripe: Option<Arc<StripeClient>>,

    /// Commerce-platform client (optional).
    pub directory: Option<Arc<DirectoryClient>>,

    /// HTTP client for the catalog and media relays (optional).
    pub relay: Option<reqwest::Client>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        // Create Stripe client if configured
        let stripe = config.stripe_api_key.as_ref().and_then(|key| {
            match StripeClient::with_base_url(key, &config.stripe_api_url) {
                Ok(client) => {
                    tracing::info!(stripe_url = %client.base_url(), "Stripe lookups enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Stripe client");
                    None
                }
            }
        });

        if stripe.is_none() {
            tracing::warn!("Stripe not configured - events are normalized from their payload only");
        }
        if config.stripe_webhook_secret.is_none() {
            tracing::warn!("Stripe webhook secret not configured - all webhooks will be rejected");
        }

        // Create directory client if configured
        let directory = config
            .directory_credentials()
            .and_then(|(url, client_id, token)| {
                match DirectoryClient::new(url, client_id, token) {
                    Ok(client) => {
                        tracing::info!(
                            directory_url = %url,
                            "Commerce platform integration enabled"
                        );
                        Some(Arc::new(
                            client.with_group_at_create(config.assign_group_at_create),
                        ))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create directory client");
                        None
                    }
                }
            });

        if directory.is_none() {
            tracing::warn!("Commerce platform not configured - handled events will fail");
        }

        let payments = stripe
            .clone()
            .map(|client| client as Arc<dyn PaymentProvider>);
        let reconciler = Reconciler::new(directory.clone(), payments, config.tier_mapping.clone())
            .with_remove_on_payment_failure(config.remove_on_payment_failure);

        let relay = match reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
        {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create relay HTTP client");
                None
            }
        };

        Self {
            config,
            reconciler: Arc::new(reconciler),
            stripe,
            directory,
            relay,
        }
    }

    /// Check if Stripe lookups are configured.
    #[must_use]
    pub fn has_stripe(&self) -> bool {
        self.stripe.is_some()
    }

    /// Check if the commerce platform is configured.
    #[must_use]
    pub fn has_directory(&self) -> bool {
        self.directory.is_some()
    }
}
