//! Service configuration.

use serde::Deserialize;
use std::path::Path;
use tier_sync_core::{GroupId, TierMapping};

use crate::stripe::client::DEFAULT_BASE_URL as STRIPE_DEFAULT_URL;
use crate::stripe::signature::DEFAULT_TOLERANCE_SECONDS;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Stripe API key (optional; sub-lookups are skipped without it).
    pub stripe_api_key: Option<String>,

    /// Stripe API base URL.
    pub stripe_api_url: String,

    /// Stripe webhook signing secret. Without it every webhook is rejected.
    pub stripe_webhook_secret: Option<String>,

    /// Maximum signature age in seconds; 0 disables the age check.
    pub signature_tolerance_seconds: u64,

    /// Commerce-platform store API root.
    pub directory_api_url: Option<String>,

    /// Commerce-platform client id (`X-Auth-Client`).
    pub directory_client_id: Option<String>,

    /// Commerce-platform access token (`X-Auth-Token`).
    pub directory_access_token: Option<String>,

    /// Set the group in the modern create call.
    pub assign_group_at_create: bool,

    /// Clear the group when a renewal payment fails.
    pub remove_on_payment_failure: bool,

    /// Price-to-group mapping.
    pub tier_mapping: TierMapping,

    /// Upstream CSV for the catalog relay.
    pub catalog_csv_url: Option<String>,

    /// Single origin allowed to read the catalog cross-origin.
    pub catalog_allowed_origin: Option<String>,

    /// HMAC secret for signed media URLs.
    pub media_signing_secret: Option<String>,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

/// Commerce-platform secrets file structure.
#[derive(Debug, Deserialize)]
struct DirectorySecrets {
    api_url: String,
    client_id: String,
    access_token: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from secrets files and `lookup`.
    ///
    /// Secrets files win over looked-up credentials; everything else comes
    /// from `lookup` or its default.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let (stripe_api_key, stripe_webhook_secret) = load_stripe_secrets(&lookup);
        let (directory_api_url, directory_client_id, directory_access_token) =
            load_directory_secrets(&lookup);
        let defaults = Self::default();

        Self {
            listen_addr: lookup("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            cors_origins: lookup("CORS_ORIGINS")
                .unwrap_or_else(|| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            max_body_bytes: parsed(&lookup, "MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parsed(&lookup, "REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            stripe_api_key,
            stripe_api_url: lookup("STRIPE_API_URL").unwrap_or(defaults.stripe_api_url),
            stripe_webhook_secret,
            signature_tolerance_seconds: parsed(&lookup, "STRIPE_SIGNATURE_TOLERANCE_SECONDS")
                .unwrap_or(defaults.signature_tolerance_seconds),
            directory_api_url,
            directory_client_id,
            directory_access_token,
            assign_group_at_create: flag(&lookup, "ASSIGN_GROUP_AT_CREATE")
                .unwrap_or(defaults.assign_group_at_create),
            remove_on_payment_failure: flag(&lookup, "REMOVE_ON_PAYMENT_FAILURE")
                .unwrap_or(defaults.remove_on_payment_failure),
            tier_mapping: load_tier_mapping(&lookup),
            catalog_csv_url: non_empty(&lookup, "CATALOG_CSV_URL"),
            catalog_allowed_origin: non_empty(&lookup, "CATALOG_ALLOWED_ORIGIN"),
            media_signing_secret: non_empty(&lookup, "MEDIA_SIGNING_SECRET"),
        }
    }

    /// Commerce-platform credentials, when all three are present.
    #[must_use]
    pub fn directory_credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.directory_api_url.as_deref()?,
            self.directory_client_id.as_deref()?,
            self.directory_access_token.as_deref()?,
        ))
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    let value = raw.trim().parse().ok();
    if value.is_none() {
        tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
    }
    value
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring unrecognized boolean setting");
            None
        }
    }
}

/// Load Stripe secrets from file or environment.
fn load_stripe_secrets(
    lookup: &impl Fn(&str) -> Option<String>,
) -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/stripe.json",
        "tier-sync/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return (
                Some(secrets.api_key),
                secrets
                    .webhook_secret
                    .or_else(|| non_empty(lookup, "STRIPE_WEBHOOK_SECRET")),
            );
        }
    }

    tracing::debug!("Stripe secrets file not found, using environment variables");
    (
        non_empty(lookup, "STRIPE_API_KEY"),
        non_empty(lookup, "STRIPE_WEBHOOK_SECRET"),
    )
}

/// Load commerce-platform secrets from file or environment.
fn load_directory_secrets(
    lookup: &impl Fn(&str) -> Option<String>,
) -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/directory.json",
        "tier-sync/.secrets/directory.json",
        "../.secrets/directory.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<DirectorySecrets>(path) {
            tracing::info!(path = %path, "Loaded directory secrets from file");
            return (
                Some(secrets.api_url),
                Some(secrets.client_id),
                Some(secrets.access_token),
            );
        }
    }

    tracing::debug!("Directory secrets file not found, using environment variables");
    (
        non_empty(lookup, "DIRECTORY_API_URL"),
        non_empty(lookup, "DIRECTORY_CLIENT_ID"),
        non_empty(lookup, "DIRECTORY_ACCESS_TOKEN"),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Build the tier mapping: inline JSON, then a JSON file, then the
/// two-entry intro/full settings. A source whose entries are all unusable
/// falls through to the next one.
fn load_tier_mapping(lookup: &impl Fn(&str) -> Option<String>) -> TierMapping {
    if let Some(json) = non_empty(lookup, "TIER_MAPPING") {
        if let Some(mapping) = usable_tier_mapping("TIER_MAPPING", &json) {
            return mapping;
        }
    }

    if let Some(path) = non_empty(lookup, "TIER_MAPPING_FILE") {
        match std::fs::read_to_string(&path) {
            Ok(json) => {
                if let Some(mapping) = usable_tier_mapping(&path, &json) {
                    return mapping;
                }
            }
            Err(e) => tracing::error!(
                path = %path,
                error = %e,
                "Unreadable tier mapping file, trying other sources"
            ),
        }
    }

    let mut mapping = TierMapping::new();
    for (price_key, group_key) in [
        ("TIER_INTRO_PRICE", "TIER_INTRO_GROUP"),
        ("TIER_FULL_PRICE", "TIER_FULL_GROUP"),
    ] {
        let (Some(price), Some(group)) = (non_empty(lookup, price_key), lookup(group_key)) else {
            continue;
        };
        match group.parse::<GroupId>() {
            Ok(group) => {
                mapping.insert(price, group);
            }
            Err(e) => tracing::error!(key = group_key, error = %e, "Skipping tier entry"),
        }
    }

    if mapping.is_empty() {
        tracing::warn!("No tier mapping configured; purchases will not change groups");
    }
    mapping
}

/// Parse one JSON mapping source, logging and dropping bad entries.
fn usable_tier_mapping(source: &str, json: &str) -> Option<TierMapping> {
    let load = match TierMapping::parse_json(json) {
        Ok(load) => load,
        Err(e) => {
            tracing::error!(source, error = %e, "Invalid tier mapping, trying other sources");
            return None;
        }
    };

    for rejected in &load.rejected {
        tracing::warn!(
            source,
            price = %rejected.price,
            error = %rejected.error,
            "Skipping tier mapping entry"
        );
    }

    if load.mapping.is_empty() {
        tracing::error!(source, "Tier mapping has no usable entries, trying other sources");
        return None;
    }
    tracing::info!(source, entries = load.mapping.len(), "Loaded tier mapping");
    Some(load.mapping)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            stripe_api_key: None,
            stripe_api_url: STRIPE_DEFAULT_URL.into(),
            stripe_webhook_secret: None,
            signature_tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
            directory_api_url: None,
            directory_client_id: None,
            directory_access_token: None,
            assign_group_at_create: true,
            remove_on_payment_failure: false,
            tier_mapping: TierMapping::new(),
            catalog_csv_url: None,
            catalog_allowed_origin: None,
            media_signing_secret: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServiceConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]);
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.stripe_api_url, STRIPE_DEFAULT_URL);
        assert_eq!(config.signature_tolerance_seconds, 300);
        assert!(config.assign_group_at_create);
        assert!(!config.remove_on_payment_failure);
        assert!(config.stripe_webhook_secret.is_none());
        assert!(config.tier_mapping.is_empty());
        assert!(config.directory_credentials().is_none());
    }

    #[test]
    fn reads_flags_and_numbers() {
        let config = config(&[
            ("REMOVE_ON_PAYMENT_FAILURE", "TRUE"),
            ("ASSIGN_GROUP_AT_CREATE", "0"),
            ("STRIPE_SIGNATURE_TOLERANCE_SECONDS", "0"),
            ("MAX_BODY_BYTES", "not-a-number"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
        ]);
        assert!(config.remove_on_payment_failure);
        assert!(!config.assign_group_at_create);
        assert_eq!(config.signature_tolerance_seconds, 0);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn directory_credentials_need_all_three() {
        let partial = config(&[
            ("DIRECTORY_API_URL", "http://store"),
            ("DIRECTORY_CLIENT_ID", "id"),
        ]);
        assert!(partial.directory_credentials().is_none());

        let full = config(&[
            ("DIRECTORY_API_URL", "http://store"),
            ("DIRECTORY_CLIENT_ID", "id"),
            ("DIRECTORY_ACCESS_TOKEN", "token"),
        ]);
        assert_eq!(full.directory_credentials(), Some(("http://store", "id", "token")));
    }

    #[test]
    fn inline_tier_mapping_wins() {
        let config = config(&[
            ("TIER_MAPPING", r#"{"price_intro_m": 2, "price_full_y": "3"}"#),
            ("TIER_INTRO_PRICE", "price_other"),
            ("TIER_INTRO_GROUP", "9"),
        ]);
        assert_eq!(config.tier_mapping.len(), 2);
        assert_eq!(config.tier_mapping.group_for("price_full_y"), Some(GroupId::new(3)));
        assert_eq!(config.tier_mapping.group_for("price_other"), None);
    }

    #[test]
    fn bad_inline_entries_are_dropped_not_the_whole_mapping() {
        let config = config(&[
            ("TIER_MAPPING", r#"{"price_intro_m": 2, "price_bad": "gold"}"#),
            ("TIER_INTRO_PRICE", "price_other"),
            ("TIER_INTRO_GROUP", "9"),
        ]);
        assert_eq!(config.tier_mapping.len(), 1);
        assert_eq!(config.tier_mapping.group_for("price_intro_m"), Some(GroupId::new(2)));
        assert_eq!(config.tier_mapping.group_for("price_other"), None);
    }

    #[test]
    fn inline_mapping_without_usable_entries_falls_through() {
        let config = config(&[
            ("TIER_MAPPING", r#"{"price_bad": "gold"}"#),
            ("TIER_INTRO_PRICE", "price_intro_m"),
            ("TIER_INTRO_GROUP", "2"),
        ]);
        assert_eq!(config.tier_mapping.group_for("price_intro_m"), Some(GroupId::new(2)));
    }

    #[test]
    fn tier_mapping_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"price": "price_a", "group": 4}}]"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = config(&[("TIER_MAPPING", "{broken"), ("TIER_MAPPING_FILE", path.as_str())]);
        assert_eq!(config.tier_mapping.group_for("price_a"), Some(GroupId::new(4)));
    }

    #[test]
    fn two_entry_fallback_skips_invalid_groups() {
        let config = config(&[
            ("TIER_INTRO_PRICE", "price_intro_m"),
            ("TIER_INTRO_GROUP", "2"),
            ("TIER_FULL_PRICE", "price_full_y"),
            ("TIER_FULL_GROUP", "gold"),
        ]);
        assert_eq!(config.tier_mapping.len(), 1);
        assert_eq!(config.tier_mapping.group_for("price_intro_m"), Some(GroupId::new(2)));
    }
}
