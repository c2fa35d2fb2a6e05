//! Auth routes: CSRF token, SSO login, password login, session info, logout.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::cookies::{clear_cookie, set_cookie, CookieOptions};
use crate::auth::csrf::{self, CsrfProtected, CSRF_COOKIE, CSRF_TTL_SECS};
use crate::auth::extract::{SessionUser, SsoCredential};
use crate::auth::password::verify_password;
use crate::auth::session::{SESSION_COOKIE, SESSION_TTL_SECS};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::student::Student;
use crate::models::user::UserResponse;
use crate::provisioning::provision_student;
use crate::response::{success, Success};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/csrf", get(csrf_token))
        .route("/auth/loginSSO", post(login_sso))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

/// Mint a session for the user and render it as a signed `Set-Cookie` value.
fn session_cookie(
    state: &AppState,
    user_id: i32,
    student_id: Option<i32>,
) -> Result<String, ApiError> {
    let token = state.sessions.mint(user_id, student_id)?;
    Ok(set_cookie(
        SESSION_COOKIE,
        &state.cookies.sign(&token),
        CookieOptions {
            max_age_secs: SESSION_TTL_SECS,
            http_only: true,
            secure: state.config.cookie_secure,
        },
    ))
}

// ---------------------------------------------------------------------------
// GET /auth/csrf
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfResponse {
    pub csrf_token: String,
}

#[utoipa::path(
    get,
    path = "/auth/csrf",
    tag = "Auth",
    responses(
        (status = 200, description = "CSRF token issued and cookie set", body = Success<CsrfResponse>),
    ),
)]
pub async fn csrf_token(State(state): State<AppState>) -> impl IntoResponse {
    let token = csrf::generate_csrf_token();
    let cookie = set_cookie(
        CSRF_COOKIE,
        &state.cookies.sign(&token),
        CookieOptions {
            max_age_secs: CSRF_TTL_SECS,
            http_only: true,
            secure: state.config.cookie_secure,
        },
    );
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        success(CsrfResponse { csrf_token: token }),
    )
}

// ---------------------------------------------------------------------------
// POST /auth/loginSSO
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/auth/loginSSO",
    tag = "Auth",
    params(("csrf-token" = String, Header, description = "Token from GET /auth/csrf")),
    responses(
        (status = 201, description = "Logged in; session cookie set", body = Success<Student>),
        (status = 401, description = "Missing, invalid, expired or forged SSO token", body = ApiErrorBody),
        (status = 403, description = "CSRF check failed", body = ApiErrorBody),
        (status = 422, description = "Unusable claim values", body = ApiErrorBody),
        (status = 503, description = "Database unavailable", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn login_sso(
    State(state): State<AppState>,
    _csrf: CsrfProtected,
    SsoCredential(claim): SsoCredential,
) -> Result<impl IntoResponse, ApiError> {
    let student = provision_student(state.store.as_ref(), &state.registry, &claim).await?;
    let cookie = session_cookie(&state, student.user_id, Some(student.id))?;

    tracing::info!(npm = %student.npm, student_id = student.id, "SSO login");

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, cookie)]),
        success(student),
    ))
}

// ---------------------------------------------------------------------------
// POST /auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub user: UserResponse,
    pub student: Option<Student>,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    params(("csrf-token" = String, Header, description = "Token from GET /auth/csrf")),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = Success<AccountResponse>),
        (status = 401, description = "Unknown user or wrong password", body = ApiErrorBody),
        (status = 403, description = "CSRF check failed", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    _csrf: CsrfProtected,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .find_user_by_username(body.username.trim())
        .await?
        .ok_or_else(|| ApiError::unauthorized("username", "Pengguna tidak ditemukan"))?;

    if !verify_password(&body.password, &user.password) {
        return Err(ApiError::unauthorized("password", "Kata sandi salah"));
    }

    let student = state.store.find_student_by_user(user.id).await?;
    let cookie = session_cookie(&state, user.id, student.as_ref().map(|s| s.id))?;

    tracing::info!(user_id = user.id, "password login");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        success(AccountResponse {
            user: user.into(),
            student,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /auth/me
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = Success<AccountResponse>),
        (status = 401, description = "No valid session", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn me(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<Success<AccountResponse>>, ApiError> {
    let user = state
        .store
        .find_user(session.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("session", "Pengguna sesi tidak ditemukan"))?;
    let student = state.store.find_student_by_user(user.id).await?;

    Ok(success(AccountResponse {
        user: user.into(),
        student,
    }))
}

// ---------------------------------------------------------------------------
// POST /auth/logout
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 204, description = "Session cookie cleared")),
)]
pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([(SET_COOKIE, clear_cookie(SESSION_COOKIE))]),
    )
}
