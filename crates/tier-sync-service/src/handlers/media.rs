//! Signed, time-limited media relay.
//!
//! A trusted issuer hands out `/media?url=..&expires=..&sig=..` links made
//! with [`sign_media_url`]. The relay checks expiry and signature, then
//! streams the upstream resource through unchanged.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::Response;
use serde::Deserialize;

use crate::crypto::{media_signature, verify_media_signature};
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /media`.
#[derive(Debug, Default, Deserialize)]
pub struct MediaQuery {
    /// Upstream resource.
    pub url: Option<String>,
    /// Unix expiry timestamp.
    pub expires: Option<String>,
    /// Hex HMAC-SHA256 over `"<url>|<expires>"`.
    pub sig: Option<String>,
}

/// Append `url`, `expires` and `sig` parameters for `target` to `endpoint`.
#[must_use]
pub fn sign_media_url(
    endpoint: &reqwest::Url,
    secret: &str,
    target: &str,
    expires: i64,
) -> reqwest::Url {
    let signature = media_signature(secret, target, expires);
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("url", target)
        .append_pair("expires", &expires.to_string())
        .append_pair("sig", &signature);
    url
}

/// Validate a signed link and stream the upstream body.
pub async fn media(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MediaQuery>,
) -> Result<Response, ApiError> {
    let secret = state
        .config
        .media_signing_secret
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("media relay not configured".into()))?;

    let (Some(url), Some(expires), Some(sig)) = (query.url, query.expires, query.sig) else {
        return Err(ApiError::BadRequest("url, expires and sig are required".into()));
    };
    let expires_text = expires.trim();
    let expires: i64 = expires_text
        .parse()
        .map_err(|_| ApiError::BadRequest("expires must be a unix timestamp".into()))?;

    if expires < chrono::Utc::now().timestamp() {
        tracing::debug!(expires, "Media link expired");
        return Err(ApiError::Forbidden);
    }
    if !verify_media_signature(secret, &url, expires_text, &sig) {
        tracing::warn!(url = %url, "Media link signature mismatch");
        return Err(ApiError::Forbidden);
    }

    let client = state
        .relay
        .as_ref()
        .ok_or_else(|| ApiError::Internal("relay HTTP client unavailable".into()))?;

    let upstream = client
        .get(&url)
        .send()
        .await
        .map_err(|e| ApiError::ExternalService(format!("media fetch failed: {e}")))?;

    let mut builder = Response::builder().status(upstream.status());
    for name in [
        header::CONTENT_TYPE,
        header::CONTENT_LENGTH,
        header::CACHE_CONTROL,
    ] {
        if let Some(value) = upstream.headers().get(&name) {
            builder = builder.header(name, value.clone());
        }
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::Internal(format!("media response: {e}")))
}
