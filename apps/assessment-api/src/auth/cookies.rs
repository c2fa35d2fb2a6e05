//! Signed cookies: `value.signature`, where the signature is unpadded
//! base64 HMAC-SHA256 of the value. Secrets are rotatable: the first secret
//! signs, any configured secret verifies.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct CookieSigner {
    secrets: Vec<String>,
}

impl CookieSigner {
    /// Panics if `secrets` is empty.
    pub fn new(secrets: Vec<String>) -> Self {
        assert!(!secrets.is_empty(), "at least one cookie secret is required");
        Self { secrets }
    }

    pub fn sign(&self, value: &str) -> String {
        format!("{}.{}", value, mac(&self.secrets[0], value))
    }

    /// The original value if any configured secret produced the signature.
    pub fn unsign(&self, signed: &str) -> Option<String> {
        let (value, signature) = signed.rsplit_once('.')?;
        let valid = self.secrets.iter().any(|secret| {
            let expected = mac(secret, value);
            expected.len() == signature.len()
                && bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
        });
        valid.then(|| value.to_string())
    }
}

fn mac(secret: &str, value: &str) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(value.as_bytes());
    STANDARD_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Attributes shared by every cookie this service sets.
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
}

/// Render a `Set-Cookie` header value scoped to the whole site with `SameSite=Lax`.
pub fn set_cookie(name: &str, value: &str, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; Max-Age={}; SameSite=Lax",
        options.max_age_secs
    );
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the cookie.
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; SameSite=Lax; HttpOnly")
}

/// Read a cookie value from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(&prefix).map(str::to_string))
}
