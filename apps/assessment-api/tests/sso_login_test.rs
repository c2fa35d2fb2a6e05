mod common;

use std::sync::atomic::Ordering;

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderName, StatusCode};
use axum_test::TestResponse;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};

use assessment_api::auth::sso::REQUIRED_CLAIMS;
use common::{TestApp, NPM};

const CSRF_HEADER: HeaderName = HeaderName::from_static("csrf-token");

async fn login_sso(app: &TestApp, token: &str) -> TestResponse {
    let (cookie, csrf) = common::csrf(&app.server).await;
    app.server
        .post("/auth/loginSSO")
        .add_header(COOKIE, cookie)
        .add_header(CSRF_HEADER, csrf)
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
}

fn assert_unauthorized(resp: &TestResponse) {
    resp.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = resp.json();
    assert_eq!(body["status"], "fail");
    assert_eq!(body["data"][0]["field"], "authorization");
}

// ---------------------------------------------------------------------------
// Token validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_segment_count_is_unauthorized() {
    let app = common::test_app();
    let valid = common::mint_sso_token(&common::sso_claims(NPM, Some("budi santoso")));
    let segments: Vec<&str> = valid.split('.').collect();

    for token in [
        segments[..2].join("."),
        format!("{valid}.extra"),
        segments[0].to_string(),
    ] {
        assert_unauthorized(&login_sso(&app, &token).await);
    }
    assert!(app.store.students().is_empty());
}

#[tokio::test]
async fn missing_authorization_is_unauthorized() {
    let app = common::test_app();
    let (cookie, csrf) = common::csrf(&app.server).await;

    let resp = app
        .server
        .post("/auth/loginSSO")
        .add_header(COOKIE, cookie)
        .add_header(CSRF_HEADER, csrf)
        .await;
    assert_unauthorized(&resp);
}

#[tokio::test]
async fn each_missing_claim_is_unauthorized() {
    let app = common::test_app();

    for key in REQUIRED_CLAIMS {
        let mut claims = common::sso_claims(NPM, Some("budi santoso"));
        claims.as_object_mut().unwrap().remove(key);
        let resp = login_sso(&app, &common::mint_sso_token(&claims)).await;
        assert_unauthorized(&resp);
    }
    assert!(app.store.students().is_empty());
}

#[tokio::test]
async fn expired_token_is_unauthorized_despite_valid_signature() {
    let app = common::test_app();
    let mut claims = common::sso_claims(NPM, Some("budi santoso"));
    claims["token_kadarluwasa"] = json!(common::now_secs() - 60.0);

    let resp = login_sso(&app, &common::mint_sso_token(&claims)).await;
    assert_unauthorized(&resp);
    let body: Value = resp.json();
    assert!(body["data"][0]["message"]
        .as_str()
        .unwrap()
        .contains("kedaluwarsa"));
}

#[tokio::test]
async fn foreign_signature_is_unauthorized() {
    let app = common::test_app();
    let claims = common::sso_claims(NPM, Some("budi santoso"));
    let token = common::mint_sso_token_with_secret(&claims, "someone-elses-secret");

    let resp = login_sso(&app, &token).await;
    assert_unauthorized(&resp);
    assert!(app.store.students().is_empty());
}

#[tokio::test]
async fn base64url_encoded_token_is_accepted() {
    let app = common::test_app();
    app.registry.down.store(true, Ordering::SeqCst);

    let token = common::mint_sso_token(&common::sso_claims(NPM, Some("budi santoso")));
    let parts: Vec<String> = token
        .split('.')
        .map(|segment| {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(segment)
                .unwrap();
            URL_SAFE_NO_PAD.encode(bytes)
        })
        .collect();

    let resp = login_sso(&app, &parts.join(".")).await;
    resp.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn lowercase_bearer_scheme_is_accepted() {
    let app = common::test_app();
    let token = common::mint_sso_token(&common::sso_claims(NPM, Some("budi santoso")));
    let (cookie, csrf) = common::csrf(&app.server).await;

    let resp = app
        .server
        .post("/auth/loginSSO")
        .add_header(COOKIE, cookie)
        .add_header(CSRF_HEADER, csrf)
        .add_header(AUTHORIZATION, format!("bearer {token}"))
        .await;
    resp.assert_status(StatusCode::CREATED);
}

// ---------------------------------------------------------------------------
// CSRF
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_csrf_is_forbidden_before_token_checks() {
    let app = common::test_app();

    let resp = app
        .server
        .post("/auth/loginSSO")
        .add_header(AUTHORIZATION, "Bearer not.a.token".to_string())
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);

    let (cookie, _) = common::csrf(&app.server).await;
    let resp = app
        .server
        .post("/auth/loginSSO")
        .add_header(COOKIE, cookie)
        .add_header(CSRF_HEADER, "csrf_wrong".to_string())
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);
    let body: Value = resp.json();
    assert_eq!(body["data"][0]["field"], "csrf");
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registry_down_provisions_default_student() {
    let app = common::test_app();
    app.registry.down.store(true, Ordering::SeqCst);

    let mut claims = common::sso_claims(NPM, Some("budi santoso"));
    for key in REQUIRED_CLAIMS {
        if key != "username" && key != "nm_pengguna" && key != "token_kadarluwasa" {
            claims[key] = Value::Null;
        }
    }

    let resp = login_sso(&app, &common::mint_sso_token(&claims)).await;
    resp.assert_status(StatusCode::CREATED);

    let body: Value = resp.json();
    assert_eq!(body["status"], "success");
    let student = &body["data"];
    assert_eq!(student["npm"], NPM);
    assert_eq!(student["name"], "Budi Santoso");
    assert_eq!(student["enrollmentYear"], "2022");
    assert_eq!(student["facultyId"], 1);
    assert_eq!(student["departmentId"], 1);
    assert_eq!(student["majorId"], 1);
    assert_eq!(student["degree"], "unknown");
    assert_eq!(student["gender"], "unknown");
    assert_eq!(student["email"], Value::Null);

    let users = app.store.users();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, NPM);
    assert_eq!(users[0].role, "student");
    assert_eq!(app.registry.detail_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn registry_data_links_local_catalog() {
    let app = common::test_app();
    let (faculty, major) = common::seed_engineering(&app.store);
    *app.registry.detail.lock() = Some(common::engineering_student("L"));

    let resp = login_sso(
        &app,
        &common::mint_sso_token(&common::sso_claims(NPM, Some("budi santoso"))),
    )
    .await;
    resp.assert_status(StatusCode::CREATED);

    let student = &resp.json::<Value>()["data"];
    assert_eq!(student["majorId"], major);
    assert_eq!(student["facultyId"], faculty);
    assert_eq!(student["departmentId"], 1);
    assert_eq!(student["gender"], "male");
    assert_eq!(student["degree"], "S1");
    assert_eq!(student["email"], format!("{NPM}@student.test"));
}

#[tokio::test]
async fn second_login_returns_same_student() {
    let app = common::test_app();
    let token = common::mint_sso_token(&common::sso_claims(NPM, Some("budi santoso")));

    let first = login_sso(&app, &token).await;
    first.assert_status(StatusCode::CREATED);
    let second = login_sso(&app, &token).await;
    second.assert_status(StatusCode::CREATED);

    assert_eq!(
        first.json::<Value>()["data"]["id"],
        second.json::<Value>()["data"]["id"]
    );
    assert_eq!(app.store.students().len(), 1);
    assert_eq!(app.store.users().len(), 1);
}

#[tokio::test]
async fn service_token_is_shared_across_logins() {
    let app = common::test_app();

    for npm in ["2215061066", "2215061067", "2115061001"] {
        let token = common::mint_sso_token(&common::sso_claims(npm, Some("mahasiswa")));
        login_sso(&app, &token).await.assert_status(StatusCode::CREATED);
    }
    assert_eq!(app.registry.logins.load(Ordering::SeqCst), 1);
    assert_eq!(app.store.students().len(), 3);
}

#[tokio::test]
async fn single_character_npm_is_unprocessable() {
    let app = common::test_app();
    let token = common::mint_sso_token(&common::sso_claims("7", Some("budi")));

    let resp = login_sso(&app, &token).await;
    resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.json::<Value>()["data"][0]["field"], "username");
}

#[tokio::test]
async fn login_sets_signed_session_cookie() {
    let app = common::test_app();
    let token = common::mint_sso_token(&common::sso_claims(NPM, Some("budi santoso")));

    let resp = login_sso(&app, &token).await;
    resp.assert_status(StatusCode::CREATED);

    let raw = resp
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sessionToken="))
        .unwrap()
        .to_string();
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Lax"));
    assert!(raw.contains("Path=/"));
    assert!(raw.contains("Max-Age=86400"));

    let pair = common::cookie_pair(&resp, "sessionToken").unwrap();
    let signed = pair.trim_start_matches("sessionToken=");
    let jwt = app.state.cookies.unsign(signed).unwrap();
    let claims = app.state.sessions.verify(&jwt).unwrap();

    let student = &resp.json::<Value>()["data"];
    assert_eq!(json!(claims.student_id), student["id"]);
    assert_eq!(json!(claims.user_id), student["userId"]);
    assert_eq!(claims.iss, "ujian.test");
}
