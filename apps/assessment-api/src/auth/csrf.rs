//! Double-submit CSRF protection: the token is handed out in a signed cookie
//! and must be echoed back in the `csrf-token` header.

use assessment_common::id::prefix;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use subtle::ConstantTimeEq;

use super::cookies::{read_cookie, CookieSigner};
use crate::error::ApiError;
use crate::AppState;

pub const CSRF_COOKIE: &str = "_csrf";
pub const CSRF_HEADER: &str = "csrf-token";

/// CSRF cookie lifetime in seconds.
pub const CSRF_TTL_SECS: i64 = 24 * 3600;

pub fn generate_csrf_token() -> String {
    let mut buf = [0u8; 24];
    rand::thread_rng().fill(&mut buf[..]);
    format!("{}_{}", prefix::CSRF, URL_SAFE_NO_PAD.encode(buf))
}

/// Check the `csrf-token` header against the signed `_csrf` cookie.
pub fn check(headers: &HeaderMap, signer: &CookieSigner) -> Result<(), ApiError> {
    let header = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::forbidden("csrf", "Token CSRF tidak ditemukan"))?;

    let expected = read_cookie(headers, CSRF_COOKIE)
        .and_then(|cookie| signer.unsign(&cookie))
        .ok_or_else(|| ApiError::forbidden("csrf", "Cookie CSRF tidak valid"))?;

    let matches = expected.len() == header.len()
        && bool::from(expected.as_bytes().ct_eq(header.as_bytes()));
    if !matches {
        return Err(ApiError::forbidden("csrf", "Token CSRF tidak cocok"));
    }
    Ok(())
}

/// Extractor that rejects the request with `403` unless the CSRF check passes.
#[derive(Debug, Clone, Copy)]
pub struct CsrfProtected;

impl FromRequestParts<AppState> for CsrfProtected {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        check(&parts.headers, &state.cookies)?;
        Ok(CsrfProtected)
    }
}
