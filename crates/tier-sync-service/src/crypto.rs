//! Cryptographic utilities for signature verification.
//!
//! This module provides the shared HMAC primitives used to verify Stripe
//! webhook deliveries and to sign and check time-limited media URLs.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over a sequence of byte slices and return it hex-encoded.
///
/// The parts are fed to the MAC in order, so `["t=1.", body]` signs exactly
/// the concatenation without building an intermediate buffer.
///
/// # Panics
///
/// This function will never panic in practice. The `expect` call is guarded by
/// the invariant that HMAC-SHA256 accepts keys of any size per RFC 2104.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, parts: &[&[u8]]) -> String {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104, so
    // `new_from_slice` only fails if the Hmac implementation is broken.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    for part in parts {
        mac.update(part);
    }
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison to prevent timing attacks.
///
/// Inputs of different length compare unequal immediately; the length of a
/// hex signature is not secret.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b) {
        result |= x ^ y;
    }
    result == 0
}

/// Signature for a media relay URL: hex HMAC-SHA256 over `"<url>|<expires>"`.
#[must_use]
pub fn media_signature(secret: &str, url: &str, expires: i64) -> String {
    signed_text_mac(secret, url, &expires.to_string())
}

fn signed_text_mac(secret: &str, url: &str, expires: &str) -> String {
    hmac_sha256_hex(secret, &[url.as_bytes(), b"|", expires.as_bytes()])
}

/// Check a media relay signature in constant time.
///
/// `expires` is the text exactly as it appeared in the link. Hex case is
/// ignored so signatures produced by other tooling still verify.
#[must_use]
pub fn verify_media_signature(secret: &str, url: &str, expires: &str, signature: &str) -> bool {
    let expected = signed_text_mac(secret, url, expires);
    constant_time_eq(
        expected.as_bytes(),
        signature.trim().to_ascii_lowercase().as_bytes(),
    )
}
