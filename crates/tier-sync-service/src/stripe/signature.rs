//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`.
//! The signed payload is the byte string `"<t>." ++ raw_body`, so the body
//! must reach this module exactly as received: no JSON parsing or
//! re-serialization may happen first.

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default maximum age of a signed delivery, in seconds.
pub const DEFAULT_TOLERANCE_SECONDS: u64 = 300;

/// How far in the future a timestamp may be before it is rejected.
const FUTURE_SKEW_SECONDS: i64 = 60;

/// Why a delivery failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// No webhook secret is configured, so nothing can be verified.
    #[error("webhook secret not configured")]
    NotConfigured,

    /// The signature header was absent or not valid UTF-8.
    #[error("missing signature header")]
    MissingHeader,

    /// The header has no `t=` component or it is not an integer.
    #[error("missing or invalid timestamp in signature header")]
    InvalidTimestamp,

    /// The header carries no `v1=` signature.
    #[error("no v1 signature in header")]
    NoSignatures,

    /// The timestamp is outside the accepted window.
    #[error("signature timestamp outside tolerance (age {age_seconds}s)")]
    OutsideTolerance {
        /// Age of the signature relative to now; negative means future.
        age_seconds: i64,
    },

    /// No listed signature matches the payload.
    #[error("signature mismatch")]
    Mismatch,
}

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: &'a str,
    signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    fn parse(header: &'a str) -> Result<Self, SignatureError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", ts)) => timestamp = Some(ts.trim()),
                Some(("v1", sig)) => signatures.push(sig.trim()),
                // v0 and unknown schemes are ignored
                _ => {}
            }
        }

        let timestamp = timestamp
            .filter(|ts| ts.parse::<i64>().is_ok())
            .ok_or(SignatureError::InvalidTimestamp)?;

        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Produce a `Stripe-Signature` header value for `payload`.
///
/// Used by tests and local tooling to emit deliveries the verifier accepts.
#[must_use]
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let ts = timestamp.to_string();
    let signature = hmac_sha256_hex(secret, &[ts.as_bytes(), b".", payload]);
    format!("t={ts},v1={signature}")
}

/// Verify a delivery against the current clock.
///
/// `tolerance_seconds == 0` disables the age check.
///
/// # Errors
///
/// Returns a [`SignatureError`] describing the first check that failed.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: u64,
) -> Result<(), SignatureError> {
    verify_at(
        payload,
        header,
        secret,
        tolerance_seconds,
        chrono::Utc::now().timestamp(),
    )
}

/// Verify a delivery against an explicit clock reading.
///
/// # Errors
///
/// Returns a [`SignatureError`] describing the first check that failed.
pub fn verify_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: u64,
    now: i64,
) -> Result<(), SignatureError> {
    let parsed = SignatureHeader::parse(header)?;

    if tolerance_seconds > 0 {
        let timestamp: i64 = parsed
            .timestamp
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        let age_seconds = now.saturating_sub(timestamp);
        let max_age = i64::try_from(tolerance_seconds).unwrap_or(i64::MAX);
        if age_seconds > max_age || age_seconds < -FUTURE_SKEW_SECONDS {
            return Err(SignatureError::OutsideTolerance { age_seconds });
        }
    }

    let expected = hmac_sha256_hex(secret, &[parsed.timestamp.as_bytes(), b".", payload]);

    let valid = parsed
        .signatures
        .iter()
        .any(|sig| constant_time_eq(expected.as_bytes(), sig.as_bytes()));

    if valid {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
