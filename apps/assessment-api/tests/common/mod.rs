use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::SET_COOKIE;
use axum::Router;
use axum_test::{TestResponse, TestServer};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};

use assessment_api::auth::signature::compute_signature;
use assessment_api::config::Config;
use assessment_api::db::store::MemoryAccountStore;
use assessment_api::models::catalog::{CatalogKind, RegistryInstitution};
use assessment_api::registry::{Registry, RegistryError, StudentDetail};
use assessment_api::AppState;

pub const SSO_SECRET: &str = "test-sso-secret";
pub const JWT_SECRET: &str = "test-jwt-secret";
pub const COOKIE_SECRET: &str = "test-cookie-secret";
pub const NPM: &str = "2215061066";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        onedata_url: "http://onedata.invalid".to_string(),
        onedata_app_id: "app".to_string(),
        onedata_username: "svc".to_string(),
        onedata_password: "svc-pass".to_string(),
        onedata_timeout_secs: 8,
        jwt_secret: JWT_SECRET.to_string(),
        sso_secret: SSO_SECRET.to_string(),
        cookie_secrets: vec![COOKIE_SECRET.to_string(), "previous-cookie-secret".to_string()],
        host: "ujian.test".to_string(),
        cookie_secure: false,
        port: 0,
    }
}

/// In-process registry whose availability and detail rows tests control.
#[derive(Default)]
pub struct FakeRegistry {
    pub down: AtomicBool,
    pub detail: Mutex<Option<StudentDetail>>,
    pub logins: AtomicUsize,
    pub detail_lookups: AtomicUsize,
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn obtain_service_token(&self) -> Result<String, RegistryError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(RegistryError::MissingField("token"));
        }
        Ok("service-token".to_string())
    }

    async fn check_service_token_active(&self, token: &str) -> bool {
        !self.down.load(Ordering::SeqCst) && token == "service-token"
    }

    async fn fetch_student_detail(
        &self,
        _token: &str,
        student_id: &str,
    ) -> Result<StudentDetail, RegistryError> {
        self.detail_lookups.fetch_add(1, Ordering::SeqCst);
        self.detail
            .lock()
            .clone()
            .ok_or_else(|| RegistryError::StudentNotFound(student_id.to_string()))
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<MemoryAccountStore>,
    pub registry: Arc<FakeRegistry>,
}

/// Build the full application router wired to in-memory state.
pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryAccountStore::new());
    let registry = Arc::new(FakeRegistry::default());
    let state = AppState::new(test_config(), store.clone(), registry.clone());
    let app: Router = assessment_api::routes::router().with_state(state.clone());

    TestApp {
        server: TestServer::new(app).unwrap(),
        state,
        store,
        registry,
    }
}

/// Seed the catalog and institution mirror with FT > Teknik Elektro > Teknik Informatika.
///
/// Returns the local (faculty, major) ids.
pub fn seed_engineering(store: &MemoryAccountStore) -> (i32, i32) {
    let faculty = store.insert_catalog(CatalogKind::Faculty, "FT");
    let major = store.insert_catalog(CatalogKind::Major, "Teknik Informatika");

    for (id, name, type_code, faculty_sms, department_sms) in [
        ("sms-ft", "FT", 1, None, None),
        ("sms-te", "Teknik Elektro", 2, Some("sms-ft"), None),
        ("sms-ti", "Teknik Informatika", 3, Some("sms-ft"), Some("sms-te")),
    ] {
        store.insert_institution(RegistryInstitution {
            id_sms: id.to_string(),
            name: name.to_string(),
            type_code,
            faculty_sms: faculty_sms.map(str::to_string),
            department_sms: department_sms.map(str::to_string),
        });
    }
    (faculty, major)
}

pub fn engineering_student(jk: &str) -> StudentDetail {
    StudentDetail {
        id_peserta_didik: Some("pd-1".to_string()),
        nm_pd: Some("BUDI SANTOSO".to_string()),
        nipd: Some(NPM.to_string()),
        jk: Some(jk.to_string()),
        id_sms: Some("sms-ti".to_string()),
        nm_jenj_didik: Some("S1".to_string()),
    }
}

pub fn now_secs() -> f64 {
    Utc::now().timestamp() as f64
}

/// A payload carrying all fourteen claims, valid for an hour.
pub fn sso_claims(npm: &str, display_name: Option<&str>) -> Value {
    json!({
        "id_aplikasi": "7",
        "url_aplikasi": "https://ujian.test",
        "id_pengguna": "u-1",
        "username": npm,
        "nm_pengguna": display_name,
        "peran_pengguna": "Mahasiswa",
        "id_sdm_pengguna": null,
        "id_pd_pengguna": "pd-1",
        "email": format!("{npm}@student.test"),
        "token_dibuat": now_secs(),
        "token_kadarluwasa": now_secs() + 3600.0,
        "asal_domain": "sso.test",
        "ip_address": "127.0.0.1",
        "sso": true
    })
}

/// Encode and sign a payload the way the SSO portal does.
pub fn mint_sso_token_with_secret(payload: &Value, secret: &str) -> String {
    let header = r#"{"typ":"JWT","alg":"HS256"}"#;
    let payload = payload.to_string();
    let signature = compute_signature(header, &payload, secret);
    format!(
        "{}.{}.{}",
        STANDARD.encode(header),
        STANDARD.encode(&payload),
        signature
    )
}

pub fn mint_sso_token(payload: &Value) -> String {
    mint_sso_token_with_secret(payload, SSO_SECRET)
}

/// `name=value` pair from the response's `Set-Cookie` header for `name`.
pub fn cookie_pair(resp: &TestResponse, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Fetch a CSRF token. Returns the `_csrf` cookie pair and the header value.
pub async fn csrf(server: &TestServer) -> (String, String) {
    let resp = server.get("/auth/csrf").await;
    resp.assert_status_ok();
    let token = resp.json::<Value>()["data"]["csrfToken"]
        .as_str()
        .unwrap()
        .to_string();
    let cookie = cookie_pair(&resp, "_csrf").unwrap();
    (cookie, token)
}
