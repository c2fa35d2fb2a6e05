/// Assessment API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// OneData registry origin (e.g. `https://onedata.example.ac.id/api`).
    pub onedata_url: String,
    /// Application id registered with OneData.
    pub onedata_app_id: String,
    /// OneData service account username.
    pub onedata_username: String,
    /// OneData service account password.
    pub onedata_password: String,
    /// Per-request timeout for OneData calls, in seconds.
    pub onedata_timeout_secs: u64,
    /// HS256 secret for session JWTs.
    pub jwt_secret: String,
    /// HMAC secret shared with the SSO portal for bearer-token signatures.
    pub sso_secret: String,
    /// Cookie signing secrets. The first entry signs; every entry verifies.
    pub cookie_secrets: Vec<String>,
    /// Public host name, used as the session token issuer.
    pub host: String,
    /// Whether cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
    /// Port the HTTP server binds to.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        let cookie_secrets = parse_secret_list(&required_var("COOKIE_SECRETS"));
        if cookie_secrets.is_empty() {
            panic!("COOKIE_SECRETS must contain at least one secret");
        }

        Self {
            database_url: required_var("DATABASE_URL"),
            onedata_url: required_var("ONEDATA_URL").trim_end_matches('/').to_string(),
            onedata_app_id: required_var("ONEDATA_APP_ID"),
            onedata_username: required_var("ONEDATA_USERNAME"),
            onedata_password: required_var("ONEDATA_PASSWORD"),
            onedata_timeout_secs: std::env::var("ONEDATA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            jwt_secret: required_var("JWT_SECRET"),
            sso_secret: required_var("SSO_SECRET"),
            cookie_secrets,
            host: std::env::var("HOST")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "localhost".to_string()),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4003),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

/// Split a comma-separated secret list, dropping blanks.
pub fn parse_secret_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
