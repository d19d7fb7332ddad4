pub mod admin;
pub mod exercises;
pub mod fixtures;
pub mod stats;
pub mod users;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::services::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public catalog
        .route("/languages", get(exercises::list_languages))
        .route("/exercises", get(exercises::list_exercises))
        .route("/exercises/:id", get(exercises::get_exercise))
        .route("/exercises/:id/run", post(exercises::run_exercise))
        // Current-user state
        .route("/statistics", get(stats::get_statistics))
        .route("/statistics/:exercise_id", get(stats::get_exercise_statistics))
        .route("/achievements", get(stats::list_achievements))
        .route("/user", get(stats::get_user))
        // Admin: exercises
        .route(
            "/admin/exercises",
            get(admin::list_full_exercises).post(admin::create_exercise),
        )
        .route("/admin/exercises/reorder", post(admin::reorder_exercises))
        .route("/admin/exercises/:id/full", get(admin::get_full_exercise))
        .route(
            "/admin/exercises/:id",
            put(admin::update_exercise).delete(admin::delete_exercise),
        )
        // Admin: diagnostics
        .route("/admin/test-solution", post(admin::test_solution))
        .route("/admin/run-test-case", post(admin::run_test_case))
        // Admin: languages and chapters
        .route("/admin/languages", post(admin::create_language))
        .route(
            "/admin/languages/:id",
            put(admin::update_language).delete(admin::delete_language),
        )
        .route("/admin/chapters", post(admin::create_chapter))
        .route(
            "/admin/chapters/:id",
            put(admin::update_chapter).delete(admin::delete_chapter),
        )
        // Admin: fixtures
        .route(
            "/admin/fixtures",
            get(fixtures::list_fixtures).post(fixtures::put_fixture),
        )
        .route("/admin/fixtures/sync", post(fixtures::sync))
        .route(
            "/admin/fixtures/:path",
            get(fixtures::get_fixture).delete(fixtures::delete_fixture),
        )
        .route("/admin/fixtures/:path/permissions", put(fixtures::set_permissions))
        .route("/admin/fixtures/:path/contents", get(fixtures::folder_contents))
        .route("/admin/fixtures/:path/files", post(fixtures::put_folder_file))
        .route(
            "/admin/fixtures/:path/files/:name",
            delete(fixtures::delete_folder_file),
        )
        // Admin: users
        .route("/admin/users", get(users::list_users))
        .route(
            "/admin/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Health
        .route("/health", get(health_check))
        .with_state(state)
}
