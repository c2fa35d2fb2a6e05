//! HTTP client for the OneData registry API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Registry, RegistryError, StudentDetail};
use crate::config::Config;

/// Token status reported by `/auth/cek_token` for a usable token.
const ACTIVE_STATUS: &str = "Aktif";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    id_aplikasi: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenStatusRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenStatusResponse {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StudentDetailResponse {
    #[serde(default)]
    data: Vec<StudentDetail>,
}

/// reqwest-backed [`Registry`] implementation.
#[derive(Clone)]
pub struct OneDataClient {
    base_url: String,
    app_id: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl OneDataClient {
    pub fn new(
        base_url: &str,
        app_id: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        Self::new(
            &config.onedata_url,
            &config.onedata_app_id,
            &config.onedata_username,
            &config.onedata_password,
            Duration::from_secs(config.onedata_timeout_secs),
        )
    }

    async fn login(&self) -> Result<String, RegistryError> {
        let url = format!("{}/auth/login", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&LoginRequest {
                id_aplikasi: &self.app_id,
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RegistryError::Status(resp.status()));
        }

        let body: LoginResponse = resp.json().await?;
        body.token
            .filter(|t| !t.is_empty())
            .ok_or(RegistryError::MissingField("token"))
    }

    async fn token_status(&self, token: &str) -> Result<Option<String>, RegistryError> {
        let url = format!("{}/auth/cek_token", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&TokenStatusRequest { token })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RegistryError::Status(resp.status()));
        }

        let body: TokenStatusResponse = resp.json().await?;
        Ok(body.status)
    }

    async fn student_detail(
        &self,
        token: &str,
        student_id: &str,
    ) -> Result<StudentDetail, RegistryError> {
        let url = format!("{}/mahasiswa/detail", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("id_peserta_didik", student_id)])
            .bearer_auth(token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RegistryError::Status(resp.status()));
        }

        let body: StudentDetailResponse = resp.json().await?;
        body.data
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::StudentNotFound(student_id.to_string()))
    }
}

#[async_trait]
impl Registry for OneDataClient {
    async fn obtain_service_token(&self) -> Result<String, RegistryError> {
        self.login().await.inspect_err(|err| {
            tracing::warn!(%err, "OneData login failed");
        })
    }

    async fn check_service_token_active(&self, token: &str) -> bool {
        match self.token_status(token).await {
            Ok(status) => status.as_deref() == Some(ACTIVE_STATUS),
            Err(err) => {
                tracing::warn!(%err, "OneData token check failed");
                false
            }
        }
    }

    async fn fetch_student_detail(
        &self,
        token: &str,
        student_id: &str,
    ) -> Result<StudentDetail, RegistryError> {
        self.student_detail(token, student_id)
            .await
            .inspect_err(|err| {
                tracing::warn!(%err, %student_id, "OneData student detail lookup failed");
            })
    }
}
