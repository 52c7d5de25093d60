//! HMAC-SHA256 signing and verification for gateway traffic.
//!
//! Outbound requests sign a pipe-joined canonical field string with the
//! create-key; inbound callbacks are verified by recomputing the mac over
//! the raw payload bytes with the verify-key. Comparison is constant-time
//! and case-insensitive over the hex encoding.

use super::GatewayError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the lowercase hex HMAC-SHA256 of `message` under `key`.
///
/// # Errors
///
/// Returns [`GatewayError::Signature`] if the mac cannot be initialized.
pub fn sign(key: &str, message: &[u8]) -> Result<String, GatewayError> {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| GatewayError::Signature)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex-encoded mac over `message` under `key`.
///
/// Case-insensitive over the hex digits, constant-time over the bytes.
#[must_use]
pub fn verify(key: &str, message: &[u8], provided_mac: &str) -> bool {
    let Ok(expected) = sign(key, message) else {
        return false;
    };
    let provided = provided_mac.to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let mac = sign("key", b"payload").unwrap();
        assert!(verify("key", b"payload", &mac));
    }

    #[test]
    fn verify_is_case_insensitive() {
        let mac = sign("key", b"payload").unwrap();
        assert!(verify("key", b"payload", &mac.to_uppercase()));
    }

    #[test]
    fn tampered_payload_fails() {
        let mac = sign("key", b"payload").unwrap();
        assert!(!verify("key", b"payload2", &mac));
    }

    #[test]
    fn wrong_key_fails() {
        let mac = sign("key", b"payload").unwrap();
        assert!(!verify("other-key", b"payload", &mac));
    }

    #[test]
    fn malformed_mac_fails() {
        assert!(!verify("key", b"payload", "not-hex-and-wrong-length"));
    }
}
