//! Request guards for SSO credentials and sessions.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;

use super::cookies::read_cookie;
use super::session::{SessionClaims, SESSION_COOKIE};
use super::signature;
use super::sso::{self, SsoClaim, SsoTokenError};
use crate::error::ApiError;
use crate::AppState;

/// Credentials of an `Authorization: Bearer` header. The scheme is case-insensitive.
fn bearer(headers: &HeaderMap) -> Option<&str> {
    let (scheme, credentials) = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .trim_start()
        .split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| credentials.trim())
}

/// A verified SSO claim taken from `Authorization: Bearer <token>`.
///
/// Structure, claims and expiry are checked before the signature.
#[derive(Debug, Clone)]
pub struct SsoCredential(pub SsoClaim);

impl FromRequestParts<AppState> for SsoCredential {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = bearer(&parts.headers).ok_or(SsoTokenError::Missing)?;
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;

        let token = sso::parse_token(raw, now).inspect_err(|err| {
            tracing::debug!(%err, "SSO token rejected");
        })?;
        signature::verify(&token, &state.config.sso_secret).inspect_err(|_| {
            tracing::warn!(npm = %token.claim.username, "SSO token signature mismatch");
        })?;

        Ok(SsoCredential(token.claim))
    }
}

/// The logged-in user, from the signed `sessionToken` cookie or a bearer session token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: i32,
    pub student_id: Option<i32>,
}

impl From<SessionClaims> for SessionUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.user_id,
            student_id: claims.student_id,
        }
    }
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match read_cookie(&parts.headers, SESSION_COOKIE) {
            Some(cookie) => state.cookies.unsign(&cookie).ok_or_else(|| {
                ApiError::unauthorized("session", "Cookie sesi tidak valid")
            })?,
            None => bearer(&parts.headers)
                .map(str::to_string)
                .ok_or_else(|| ApiError::unauthorized("session", "Sesi tidak ditemukan"))?,
        };

        state.sessions.verify(&token).map(SessionUser::from)
    }
}
