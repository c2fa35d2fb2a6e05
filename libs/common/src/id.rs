use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = assessment_common::id::prefixed_ulid("ses");
/// assert!(id.starts_with("ses_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Prefixes for identifiers minted by the assessment services.
pub mod prefix {
    /// Session token id (`jti`).
    pub const SESSION: &str = "ses";
    /// Anti-CSRF token.
    pub const CSRF: &str = "csrf";
}
