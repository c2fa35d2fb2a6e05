//! Session tokens issued after a successful login.

use assessment_common::id::{prefix, prefixed_ulid};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "sessionToken";

/// Session lifetime in seconds (24 hours). Also the cookie max-age.
pub const SESSION_TTL_SECS: i64 = 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub student_id: Option<i32>,
    pub user_id: i32,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
    pub exp: i64,
}

/// HS256 keys and the issuer every session token is bound to.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
}

impl SessionKeys {
    pub fn from_secret(secret: &str, issuer: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
        }
    }

    pub fn mint(&self, user_id: i32, student_id: Option<i32>) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = SessionClaims {
            student_id,
            user_id,
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: prefixed_ulid(prefix::SESSION),
            exp: (now + Duration::seconds(SESSION_TTL_SECS)).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |e| {
                tracing::error!(?e, "failed to sign session token");
                ApiError::internal("Token signing failed")
            },
        )
    }

    /// Decode a session token, checking signature, expiry and issuer.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(?e, "session token rejected");
                ApiError::unauthorized("session", "Sesi tidak valid atau sudah berakhir")
            })
    }
}
