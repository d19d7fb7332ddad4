//! Admin façade: exercise and fixture management over HTTP, including the
//! JSON shapes clients depend on.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::Duration;
use tower::ServiceExt;

use base64::Engine;
use codeforge::middleware::auth::issue_token;

use common::{seed_basic_catalog, test_env};

fn admin_auth() -> String {
    let token = issue_token(
        "admin-1",
        "admin@example.com",
        "Admin",
        "test-secret",
        Duration::hours(1),
    )
    .unwrap();
    format!("Bearer {token}")
}

fn json_request(method: Method, uri: &str, auth: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn exercise_lifecycle_over_http() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    let app = codeforge::handlers::create_router(env.state.clone());
    let auth = admin_auth();

    // Create with one test case.
    let payload = serde_json::json!({
        "id": "greet",
        "chapter_id": "basics",
        "title": "Greeting",
        "description": "Echo a greeting.",
        "solution": "echo \"My name is $1 and I am $2 years old.\"",
        "test_cases": [{
            "args": ["John", "30"],
            "expected_stdout": "My name is John and I am 30 years old.\n",
            "expected_exit_code": 0
        }]
    });
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/admin/exercises",
            &auth,
            payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["id"], "greet");
    assert_eq!(created["test_cases"][0]["args"][0], "John");

    // Full read includes test cases; public read does not.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/exercises/greet/full")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let full = body_json(response).await;
    assert_eq!(full["test_cases"].as_array().unwrap().len(), 1);

    // Delete.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/admin/exercises/greet")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(env
        .state
        .catalog
        .get_exercise("greet")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn malformed_exercise_id_is_rejected() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let payload = serde_json::json!({
        "id": "Not Valid!",
        "chapter_id": "basics",
        "title": "Broken"
    });
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/admin/exercises",
            &admin_auth(),
            payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fixture_lifecycle_over_http() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());
    let auth = admin_auth();
    let content = base64::engine::general_purpose::STANDARD.encode(b"1 2 3\n");

    // Upload.
    let payload = serde_json::json!({
        "path": "minefield.txt",
        "kind": "file",
        "content": content,
        "permissions": "rw-r--r--"
    });
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/admin/fixtures",
            &auth,
            payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Read back with content.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/fixtures/minefield.txt")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["path"], "minefield.txt");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(fetched["content"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, b"1 2 3\n");

    // Permissions update.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/admin/fixtures/minefield.txt/permissions",
            &auth,
            serde_json::json!({ "permissions": "rwxr-xr-x" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["permissions"], "rwxr-xr-x");

    // Sync with intact storage removes nothing.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/admin/fixtures/sync",
            &auth,
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    let sync = body_json(response).await;
    assert_eq!(sync["removed"].as_array().unwrap().len(), 0);

    // Delete.
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/admin/fixtures/minefield.txt")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn folder_endpoints_manage_contained_files() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());
    let auth = admin_auth();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/admin/fixtures",
            &auth,
            serde_json::json!({ "path": "data", "kind": "folder" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content = base64::engine::general_purpose::STANDARD.encode(b"sample");
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/admin/fixtures/data/files",
            &auth,
            serde_json::json!({ "name": "sample.txt", "content": content }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/fixtures/data/contents")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let contents = body_json(response).await;
    assert_eq!(contents.as_array().unwrap().len(), 1);
    assert_eq!(contents[0]["path"], "data/sample.txt");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/admin/fixtures/data/files/sample.txt")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn reorder_endpoint_rewrites_catalog_order() {
    let env = test_env().await;
    seed_basic_catalog(&env.state).await;
    common::seed_exercises(&env.state, "basics", "ex", 3).await;
    let app = codeforge::handlers::create_router(env.state.clone());

    let payload = serde_json::json!([
        { "id": "ex-3", "chapter_id": "basics" },
        { "id": "ex-1", "chapter_id": "basics" },
        { "id": "ex-2", "chapter_id": "basics" }
    ]);
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/admin/exercises/reorder",
            &admin_auth(),
            payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let ids: Vec<String> = env
        .state
        .catalog
        .list_exercises("shell")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["ex-3", "ex-1", "ex-2"]);
}

#[tokio::test]
async fn user_management_over_http() {
    let env = test_env().await;
    let app = codeforge::handlers::create_router(env.state.clone());
    let auth = admin_auth();

    env.state
        .users
        .upsert_login("learner", "learner@example.com", "Learner")
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/users")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let users = body_json(response).await;
    assert!(users
        .as_array()
        .unwrap()
        .iter()
        .any(|u| u["id"] == "learner"));

    // Promote, then delete.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/admin/users/learner",
            &auth,
            serde_json::json!({ "isAdmin": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let promoted = body_json(response).await;
    assert_eq!(promoted["is_admin"], true);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/admin/users/learner")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(env.state.users.get("learner").await.unwrap().is_none());
}
