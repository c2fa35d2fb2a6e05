pub mod auth;
pub mod health;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        health::registry_health,
        // Auth
        auth::csrf_token,
        auth::login_sso,
        auth::login,
        auth::me,
        auth::logout,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::FieldError,
            // Models
            crate::models::student::Student,
            crate::models::user::UserResponse,
            crate::models::user::Role,
            // Route request/response types
            health::HealthResponse,
            health::RegistryHealth,
            auth::CsrfResponse,
            auth::LoginRequest,
            auth::AccountResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health checks"),
        (name = "Auth", description = "SSO login, sessions and CSRF"),
    )
)]
pub struct ApiDoc;
