//! Decoding and claim validation for the SSO portal's bearer token.
//!
//! The token looks like a JWT (`header.payload.signature`) but is produced by
//! a PHP signer: segments may be plain base64 or base64url, padding is
//! optional, and the signature is not JWS-compatible (see [`super::signature`]).

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Claim keys that must be present in the payload (values may be null).
pub const REQUIRED_CLAIMS: [&str; 14] = [
    "id_aplikasi",
    "url_aplikasi",
    "id_pengguna",
    "username",
    "nm_pengguna",
    "peran_pengguna",
    "id_sdm_pengguna",
    "id_pd_pengguna",
    "email",
    "token_dibuat",
    "token_kadarluwasa",
    "asal_domain",
    "ip_address",
    "sso",
];

const EXPIRY_CLAIM: &str = "token_kadarluwasa";

/// Standard alphabet, padding optional, non-canonical trailing bits accepted.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why an SSO bearer token was rejected. Every variant is a `401`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SsoTokenError {
    #[error("Token SSO tidak ditemukan")]
    Missing,
    #[error("Format token SSO tidak valid")]
    Malformed,
    #[error("Token SSO tidak dapat didekode")]
    Undecodable,
    #[error("Payload token SSO bukan objek JSON")]
    PayloadNotObject,
    #[error("Klaim token SSO tidak lengkap: {0}")]
    MissingClaim(&'static str),
    #[error("Klaim token SSO tidak valid: {0}")]
    InvalidClaim(&'static str),
    #[error("Masa berlaku token SSO tidak valid")]
    InvalidExpiry,
    #[error("Token SSO sudah kedaluwarsa")]
    Expired,
    #[error("Tanda tangan token SSO tidak valid")]
    InvalidSignature,
}

impl From<SsoTokenError> for ApiError {
    fn from(err: SsoTokenError) -> Self {
        ApiError::unauthorized("authorization", err.to_string())
    }
}

/// Decoded SSO payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SsoClaim {
    #[serde(rename = "id_aplikasi", deserialize_with = "lenient_string")]
    pub application_id: Option<String>,
    #[serde(rename = "url_aplikasi", deserialize_with = "lenient_string")]
    pub application_url: Option<String>,
    #[serde(rename = "id_pengguna", deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    /// Student NPM.
    pub username: String,
    #[serde(rename = "nm_pengguna", deserialize_with = "lenient_string")]
    pub display_name: Option<String>,
    #[serde(rename = "peran_pengguna", deserialize_with = "lenient_string")]
    pub role: Option<String>,
    #[serde(rename = "id_sdm_pengguna", deserialize_with = "lenient_string")]
    pub staff_id: Option<String>,
    #[serde(rename = "id_pd_pengguna", deserialize_with = "lenient_string")]
    pub student_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(rename = "token_dibuat", deserialize_with = "lenient_number")]
    pub issued_at: Option<f64>,
    #[serde(rename = "token_kadarluwasa", deserialize_with = "lenient_number")]
    pub expires_at: Option<f64>,
    #[serde(rename = "asal_domain", deserialize_with = "lenient_string")]
    pub origin_domain: Option<String>,
    #[serde(rename = "ip_address", deserialize_with = "lenient_string")]
    pub client_ip: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub sso: Option<bool>,
}

/// A structurally valid, unexpired token. The signature is checked separately.
#[derive(Debug, Clone)]
pub struct SsoToken {
    /// Decoded header text.
    pub header: String,
    /// Decoded payload text.
    pub payload: String,
    /// Signature segment exactly as received.
    pub signature: String,
    pub claim: SsoClaim,
}

/// Decode a base64 or base64url segment into UTF-8 text.
///
/// `-`, `_` and spaces are mapped back to the standard alphabet and missing
/// padding is tolerated.
pub fn decode_segment(segment: &str) -> Option<String> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' | ' ' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let bytes = LENIENT_BASE64.decode(normalized).ok()?;
    String::from_utf8(bytes).ok()
}

/// Validate structure, claim presence and expiry.
///
/// `now` is the current time in (fractional) seconds since the Unix epoch.
pub fn parse_token(raw: &str, now: f64) -> Result<SsoToken, SsoTokenError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SsoTokenError::Missing);
    }

    let segments: Vec<&str> = raw.split('.').collect();
    let [header, payload, signature] = segments[..] else {
        return Err(SsoTokenError::Malformed);
    };

    let header = decode_segment(header).ok_or(SsoTokenError::Undecodable)?;
    let payload = decode_segment(payload).ok_or(SsoTokenError::Undecodable)?;

    let object: Map<String, Value> = match serde_json::from_str(&payload) {
        Ok(Value::Object(map)) => map,
        _ => return Err(SsoTokenError::PayloadNotObject),
    };

    if let Some(missing) = REQUIRED_CLAIMS.iter().find(|key| !object.contains_key(**key)) {
        return Err(SsoTokenError::MissingClaim(*missing));
    }

    let expiry = object
        .get(EXPIRY_CLAIM)
        .and_then(coerce_number)
        .ok_or(SsoTokenError::InvalidExpiry)?;
    if expiry - now < 0.0 {
        return Err(SsoTokenError::Expired);
    }

    let claim: SsoClaim = serde_json::from_value(Value::Object(object)).map_err(|e| {
        tracing::debug!(?e, "SSO claim shape rejected");
        SsoTokenError::InvalidClaim("username")
    })?;

    Ok(SsoToken {
        header,
        payload,
        signature: signature.to_string(),
        claim,
    })
}

/// Number coercion for claim values: JSON numbers or numeric strings, finite only.
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_number(&Value::deserialize(deserializer)?))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
