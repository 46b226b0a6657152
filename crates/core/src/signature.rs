//! Webhook payload signing and verification.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the delivery worker and any receiver-side tooling. Signatures are
//! HMAC-SHA256 over the exact bytes placed on the wire; re-serializing the
//! payload before signing is forbidden because JSON key order is not
//! guaranteed to survive a round trip.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header value prefix identifying the signature scheme.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Length of a generated webhook signing secret (alphanumeric characters).
pub const SECRET_LENGTH: usize = 48;

/// Compute an HMAC-SHA256 signature for a webhook payload.
///
/// Returns the hex-encoded digest. The caller prepends
/// [`SIGNATURE_PREFIX`] when building the `X-Webhook-Signature` header.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Build the full `X-Webhook-Signature` header value for a payload.
pub fn signature_header(payload: &[u8], secret: &str) -> String {
    format!("{SIGNATURE_PREFIX}{}", sign(payload, secret))
}

/// Verify a `sha256=<hex>` signature header against the raw request body.
///
/// The comparison is constant-time (via `Mac::verify_slice`), so the
/// verification duration leaks nothing about how many digest bytes match.
/// Returns `false` for a missing prefix or malformed hex rather than
/// erroring; a bad signature and a garbled one are the same to callers.
pub fn verify(body: &[u8], signature_header: &str, secret: &str) -> bool {
    let Some(sig_hex) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Some(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&sig_bytes).is_ok()
}

/// Generate a new random webhook signing secret.
///
/// The secret is shown to the owner and stored with the subscription.
/// Rotating a subscription's secret replaces it atomically; signatures
/// produced with the previous secret fail verification immediately.
pub fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string, returning `None` on any malformed input.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
