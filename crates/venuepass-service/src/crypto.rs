//! Cryptographic helpers for webhook and credential verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over raw bytes and return the hex-encoded result.
///
/// Webhook signatures are computed over the exact raw request body, so this
/// takes byte slices rather than strings.
///
/// # Panics
///
/// Never panics in practice: HMAC-SHA256 accepts keys of any length per
/// RFC 2104, so `new_from_slice` only fails if the implementation is broken.
#[must_use]
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC-SHA256 accepts any key size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison for signature checks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_output_is_hex_sha256() {
        let out = hmac_sha256_hex(b"key", b"message");
        assert_eq!(out.len(), 64);
        assert!(out.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn hmac_is_deterministic_and_keyed() {
        assert_eq!(
            hmac_sha256_hex(b"secret", b"payload"),
            hmac_sha256_hex(b"secret", b"payload")
        );
        assert_ne!(
            hmac_sha256_hex(b"secret", b"payload"),
            hmac_sha256_hex(b"other", b"payload")
        );
    }

    #[test]
    fn constant_time_eq_basic() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(constant_time_eq("", ""));
    }
}
