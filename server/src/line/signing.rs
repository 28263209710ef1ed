//! Webhook Signature Verification
//!
//! LINE signs every callback body with HMAC-SHA256 keyed by the channel
//! secret and sends the base64-encoded digest in `X-Line-Signature`.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Sign a payload and return the base64-encoded signature.
pub fn sign_payload(channel_secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(channel_secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Verify a base64-encoded signature against a payload.
///
/// Undecodable signatures never match. The digest comparison is constant time.
pub fn verify_signature(channel_secret: &str, payload: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(channel_secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
