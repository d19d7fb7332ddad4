//! Grading façade: request validation, identity requirements, and the
//! response envelope. Container execution itself is exercised against a real
//! runtime in deployment; these tests stop at the engine boundary.

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

fn run_request(exercise_id: &str, auth: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/exercises/{exercise_id}/run"))
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn unknown_exercise_is_not_found() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app
        .oneshot(run_request(
            "ghost",
            &bearer("user-1", "user@example.com"),
            r#"{"script":"echo hi"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_script_is_rejected() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    env.state
        .catalog
        .create_exercise(&exercise("greet", "basics", vec![echo_case(&[], "hi\n")]))
        .await
        .unwrap();
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app
        .oneshot(run_request(
            "greet",
            &bearer("user-1", "user@example.com"),
            r#"{"script":"   \n"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn exercise_without_test_cases_is_ungradable() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    env.state
        .catalog
        .create_exercise(&exercise("empty", "basics", vec![]))
        .await
        .unwrap();
    let app = codeforge::handlers::create_router(env.state.clone());

    let response = app
        .oneshot(run_request(
            "empty",
            &bearer("user-1", "user@example.com"),
            r#"{"script":"echo hi"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("test cases"));
}

#[tokio::test]
async fn rejected_submission_records_no_attempt() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    env.state
        .catalog
        .create_exercise(&exercise("greet", "basics", vec![echo_case(&[], "hi\n")]))
        .await
        .unwrap();
    let app = codeforge::handlers::create_router(env.state.clone());
    let auth = bearer("user-1", "user@example.com");

    let response = app
        .oneshot(run_request("greet", &auth, r#"{"script":""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let progress = env
        .state
        .progress
        .exercise_progress("user-1", "greet")
        .await
        .unwrap();
    assert!(progress.is_none(), "validation failures never reach the engine");
}
