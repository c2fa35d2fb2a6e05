pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod provisioning;
pub mod registry;
pub mod response;
pub mod routes;

use std::sync::Arc;

use auth::cookies::CookieSigner;
use auth::session::SessionKeys;
use config::Config;
use db::store::AccountStore;
use registry::cache::MemoryTokenCache;
use registry::{Registry, RegistryGateway};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub registry: RegistryGateway,
    pub sessions: Arc<SessionKeys>,
    pub cookies: Arc<CookieSigner>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire up state with a fresh process-wide service-token cache.
    pub fn new(config: Config, store: Arc<dyn AccountStore>, registry: Arc<dyn Registry>) -> Self {
        let registry = RegistryGateway::new(registry, Arc::new(MemoryTokenCache::new()));
        let sessions = SessionKeys::from_secret(&config.jwt_secret, &config.host);
        let cookies = CookieSigner::new(config.cookie_secrets.clone());

        Self {
            store,
            registry,
            sessions: Arc::new(sessions),
            cookies: Arc::new(cookies),
            config: Arc::new(config),
        }
    }
}
