// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! X-Hub-Signature-256 validation for inbound webhooks.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Validate a `sha256=<hex>` signature header against the raw request body.
///
/// Comparison runs through the Mac verifier, which is constant-time.
pub fn verify_signature(app_secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the `sha256=<hex>` header value for a body. Test helper for
/// simulating the provider side.
pub fn sign(app_secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_verifies() {
        let header = sign("secret", b"payload");
        assert!(verify_signature("secret", b"payload", &header));
    }

    #[test]
    fn wrong_secret_fails() {
        let header = sign("secret", b"payload");
        assert!(!verify_signature("other", b"payload", &header));
    }

    #[test]
    fn tampered_body_fails() {
        let header = sign("secret", b"payload");
        assert!(!verify_signature("secret", b"payload2", &header));
    }

    #[test]
    fn malformed_headers_fail_closed() {
        assert!(!verify_signature("secret", b"payload", "sha1=abc"));
        assert!(!verify_signature("secret", b"payload", "sha256=zz-not-hex"));
        assert!(!verify_signature("secret", b"payload", ""));
    }
}
