//! OneData student registry: outbound client, service-token cache, and the
//! gateway that ties the two together.

pub mod cache;
pub mod client;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use cache::ServiceTokenCache;

/// How long an acquired service token is reused. Upstream tokens live ~60 minutes.
pub const SERVICE_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

/// Failure talking to the registry. Callers treat every variant as "data unavailable".
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("registry responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("registry response is missing {0}")]
    MissingField(&'static str),
    #[error("student {0} not found in registry")]
    StudentNotFound(String),
}

/// One row of `GET /mahasiswa/detail`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StudentDetail {
    pub id_peserta_didik: Option<String>,
    pub nm_pd: Option<String>,
    pub nipd: Option<String>,
    /// Sex code: `L` (laki-laki) or `P` (perempuan).
    pub jk: Option<String>,
    /// Institution (study program) the student is enrolled in.
    pub id_sms: Option<String>,
    /// Education level name, e.g. `S1`.
    pub nm_jenj_didik: Option<String>,
}

/// Operations offered by the registry API.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Log in with the application credentials and return a bearer token.
    async fn obtain_service_token(&self) -> Result<String, RegistryError>;

    /// `true` only when the registry reports the token status as `Aktif`.
    async fn check_service_token_active(&self, token: &str) -> bool;

    /// First detail row for an external student id.
    async fn fetch_student_detail(
        &self,
        token: &str,
        student_id: &str,
    ) -> Result<StudentDetail, RegistryError>;
}

/// Registry access with a shared, lazily refreshed service token.
#[derive(Clone)]
pub struct RegistryGateway {
    registry: Arc<dyn Registry>,
    cache: Arc<dyn ServiceTokenCache>,
}

impl RegistryGateway {
    pub fn new(registry: Arc<dyn Registry>, cache: Arc<dyn ServiceTokenCache>) -> Self {
        Self { registry, cache }
    }

    /// Return the cached service token, logging in again once it has expired.
    ///
    /// A failed login clears the cache. Concurrent refreshes are harmless:
    /// each caller gets a valid token and the last write stays cached.
    pub async fn service_token(&self) -> Result<String, RegistryError> {
        if let Some(token) = self.cache.get() {
            return Ok(token);
        }

        match self.registry.obtain_service_token().await {
            Ok(token) => {
                self.cache.set(token.clone(), SERVICE_TOKEN_TTL);
                tracing::debug!("registry service token refreshed");
                Ok(token)
            }
            Err(err) => {
                self.cache.clear();
                Err(err)
            }
        }
    }

    pub async fn fetch_student_detail(
        &self,
        token: &str,
        student_id: &str,
    ) -> Result<StudentDetail, RegistryError> {
        self.registry.fetch_student_detail(token, student_id).await
    }

    /// Whether the registry accepts our current service token.
    pub async fn is_available(&self) -> bool {
        match self.service_token().await {
            Ok(token) => self.registry.check_service_token_active(&token).await,
            Err(err) => {
                tracing::warn!(%err, "registry login failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::cache::MemoryTokenCache;
    use super::*;

    struct CountingRegistry {
        logins: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Registry for CountingRegistry {
        async fn obtain_service_token(&self) -> Result<String, RegistryError> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(RegistryError::Status(reqwest::StatusCode::BAD_GATEWAY));
            }
            Ok(format!("token-{n}"))
        }

        async fn check_service_token_active(&self, token: &str) -> bool {
            token.starts_with("token-")
        }

        async fn fetch_student_detail(
            &self,
            _token: &str,
            student_id: &str,
        ) -> Result<StudentDetail, RegistryError> {
            Err(RegistryError::StudentNotFound(student_id.to_string()))
        }
    }

    fn gateway(fail: bool) -> (RegistryGateway, Arc<CountingRegistry>, Arc<MemoryTokenCache>) {
        let registry = Arc::new(CountingRegistry {
            logins: AtomicUsize::new(0),
            fail,
        });
        let cache = Arc::new(MemoryTokenCache::new());
        (
            RegistryGateway::new(registry.clone(), cache.clone()),
            registry,
            cache,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn token_is_reused_within_fifty_minutes() {
        let (gateway, registry, _) = gateway(false);

        let first = gateway.service_token().await.unwrap();
        tokio::time::advance(Duration::from_secs(49 * 60)).await;
        let second = gateway.service_token().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn token_is_refreshed_after_fifty_minutes() {
        let (gateway, registry, _) = gateway(false);

        gateway.service_token().await.unwrap();
        tokio::time::advance(Duration::from_secs(50 * 60 + 1)).await;
        let second = gateway.service_token().await.unwrap();

        assert_eq!(second, "token-2");
        assert_eq!(registry.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_login_leaves_cache_empty() {
        let (gateway, registry, cache) = gateway(true);

        assert!(gateway.service_token().await.is_err());
        assert!(cache.get().is_none());
        assert!(gateway.service_token().await.is_err());
        assert_eq!(registry.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn availability_follows_token_status() {
        let (up, _, _) = gateway(false);
        assert!(up.is_available().await);

        let (down, _, _) = gateway(true);
        assert!(!down.is_available().await);
    }
}
