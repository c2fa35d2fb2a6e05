//! HMAC-SHA256 signature check for SSO tokens.
//!
//! The portal signs `base64(header) + "." + base64(payload)` using PHP's
//! standard `base64_encode` (not base64url) and emits the digest in standard
//! base64. The check re-encodes the decoded segments the same way; a JWS
//! verifier would compute a different signing input.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::sso::{SsoToken, SsoTokenError};

type HmacSha256 = Hmac<Sha256>;

/// Signature the portal would have produced for the given decoded segments.
pub fn compute_signature(header: &str, payload: &str, secret: &str) -> String {
    let signing_input = format!("{}.{}", STANDARD.encode(header), STANDARD.encode(payload));
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(signing_input.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Map a received signature onto the standard alphabet and pad it to a multiple of 4.
pub fn normalize_signature(received: &str) -> String {
    let mut normalized: String = received
        .chars()
        .map(|c| match c {
            '-' | ' ' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    normalized
}

/// Constant-time comparison of the expected and received signatures.
pub fn signature_matches(header: &str, payload: &str, received: &str, secret: &str) -> bool {
    let expected = compute_signature(header, payload, secret);
    let received = normalize_signature(received);
    if expected.len() != received.len() {
        return false;
    }
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

pub fn verify(token: &SsoToken, secret: &str) -> Result<(), SsoTokenError> {
    if signature_matches(&token.header, &token.payload, &token.signature, secret) {
        Ok(())
    } else {
        Err(SsoTokenError::InvalidSignature)
    }
}
