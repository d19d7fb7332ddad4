//! Authorization gateway: anonymous, authenticated, and admin access over
//! the HTTP façade.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use tower::ServiceExt;

use codeforge::middleware::auth::issue_token;

use common::{echo_case, exercise, seed_basic_catalog, test_env};

fn bearer(sub: &str, email: &str) -> String {
    let token = issue_token(sub, email, sub, "test-secret", Duration::hours(1)).unwrap();
    format!("Bearer {token}")
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

// ===== anonymous access =====

#[tokio::test]
async fn public_listing_needs_no_authentication() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app
        .clone()
        .oneshot(get("/languages", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/exercises?language=shell", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn exercise_metadata_hides_solution_and_tests() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    env.state
        .catalog
        .create_exercise(&exercise("greet", "basics", vec![echo_case(&[], "hi\n")]))
        .await
        .unwrap();
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app.oneshot(get("/exercises/greet", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["id"], "greet");
    assert!(json.get("solution").is_none());
    assert!(json.get("testCases").is_none());
    assert!(json.get("test_cases").is_none());
}

#[tokio::test]
async fn statistics_require_authentication() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app.oneshot(get("/statistics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn grading_requires_authentication() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/exercises/greet/run")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"script":"echo hi"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app
        .oneshot(get("/statistics", Some("Bearer not-a-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ===== authenticated, non-admin =====

#[tokio::test]
async fn user_endpoint_reflects_identity() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app
        .clone()
        .oneshot(get("/user", None))
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["authenticated"], false);

    let response = app
        .oneshot(get("/user", Some(&bearer("user-1", "user@example.com"))))
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["authenticated"], true);
    assert_eq!(json["user"]["id"], "user-1");
}

#[tokio::test]
async fn authentication_auto_creates_the_user() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());

    assert!(env.state.users.get("fresh").await.unwrap().is_none());

    let response = app
        .oneshot(get(
            "/statistics",
            Some(&bearer("fresh", "fresh@example.com")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = env.state.users.get("fresh").await.unwrap().expect("created");
    assert_eq!(user.email, "fresh@example.com");
    assert!(!user.is_admin);
}

#[tokio::test]
async fn non_admin_is_forbidden_from_admin_surface() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());
    let auth = bearer("user-1", "user@example.com");

    for uri in ["/admin/exercises", "/admin/fixtures", "/admin/users"] {
        let response = app.clone().oneshot(get(uri, Some(&auth))).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::FORBIDDEN,
            "non-admin must not reach {uri}"
        );
    }
}

// ===== admin =====

#[tokio::test]
async fn admin_flag_from_email_list_grants_access() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app
        .oneshot(get(
            "/admin/exercises",
            Some(&bearer("admin-1", "admin@example.com")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn promoted_user_gains_admin_access() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());
    let auth = bearer("user-2", "user2@example.com");

    // Authenticate once so the row exists, then promote.
    let response = app
        .clone()
        .oneshot(get("/statistics", Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/admin/users", Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    env.state.users.set_admin("user-2", true).await.unwrap();

    let response = app.oneshot(get("/admin/users", Some(&auth))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
