//! HMAC-SHA256 webhook signature verification.
//!
//! GitHub signs each delivery with a shared secret and presents the
//! result in the `X-Hub-Signature-256` header as `sha256=<hex>`. The
//! signature covers the exact raw request body, so verification must
//! happen before any parsing touches the bytes.
//!
//! Verification fails closed: a malformed header, wrong algorithm tag,
//! or bad hex all verify as `false`, never as an error or a panic. The
//! comparison itself is constant-time (via `Mac::verify_slice`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header prefix GitHub uses for SHA-256 signatures.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Decodes a `sha256=<hex>` header value into raw signature bytes.
///
/// Returns `None` for a missing prefix, a different algorithm tag, or
/// invalid hex.
fn decode_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix(SIGNATURE_PREFIX)?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 of a payload under the given secret.
///
/// Used by the server tests to construct valid deliveries; the
/// verification path goes through [`verify_signature`].
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so new_from_slice cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Renders a raw signature as a `sha256=<hex>` header value.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(signature))
}

/// Verifies a webhook signature header against the raw payload.
///
/// Returns `true` iff the header decodes and matches the HMAC-SHA256
/// of `payload` under `secret`. Comparison is constant-time.
///
/// # Examples
///
/// ```
/// use autoprx::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let body = br#"{"action":"opened"}"#;
/// let header = format_signature_header(&compute_signature(body, b"shared-secret"));
///
/// assert!(verify_signature(body, &header, b"shared-secret"));
/// assert!(!verify_signature(body, &header, b"other-secret"));
/// assert!(!verify_signature(body, "sha256=deadbeef", b"shared-secret"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(provided) = decode_signature_header(signature_header) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);

    mac.verify_slice(&provided).is_ok()
}
