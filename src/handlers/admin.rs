//! Admin operations on the execution plan: exercise, chapter and language
//! CRUD, reordering, and the diagnostic run endpoints. Every handler gates on
//! the effective admin flag.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::exercise::valid_exercise_id;
use crate::models::{Chapter, ExerciseData, ExerciseWithTests, Language};
use crate::repository::catalog::ReorderEntry;
use crate::services::comparator::FileCheck;
use crate::services::AppState;

// ----- exercises -----

pub async fn list_full_exercises(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<ExerciseWithTests>>> {
    user.require_admin()?;
    let mut full = Vec::new();
    for exercise in state.catalog.list_all_exercises().await? {
        let test_cases = state.catalog.list_test_cases(&exercise.id).await?;
        full.push(ExerciseWithTests {
            exercise,
            test_cases,
        });
    }
    Ok(Json(full))
}

pub async fn get_full_exercise(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ExerciseWithTests>> {
    user.require_admin()?;
    let exercise = state
        .catalog
        .get_exercise_with_tests(&id)
        .await?
        .ok_or_else(|| Error::not_found(format!("exercise {id}")))?;
    Ok(Json(exercise))
}

pub async fn create_exercise(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(data): Json<ExerciseData>,
) -> Result<Json<ExerciseWithTests>> {
    user.require_admin()?;
    validate_exercise_data(&state, &data).await?;
    if state.catalog.get_exercise(&data.id).await?.is_some() {
        return Err(Error::validation(format!(
            "exercise {} already exists",
            data.id
        )));
    }

    state.catalog.create_exercise(&data).await?;
    tracing::info!(exercise = %data.id, "exercise created");

    let created = state
        .catalog
        .get_exercise_with_tests(&data.id)
        .await?
        .ok_or_else(|| Error::Internal("exercise vanished after create".into()))?;
    Ok(Json(created))
}

pub async fn update_exercise(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(mut data): Json<ExerciseData>,
) -> Result<Json<ExerciseWithTests>> {
    user.require_admin()?;
    data.id = id.clone();
    validate_exercise_data(&state, &data).await?;

    state.catalog.update_exercise(&id, &data).await?;
    tracing::info!(exercise = %id, "exercise updated");

    let updated = state
        .catalog
        .get_exercise_with_tests(&id)
        .await?
        .ok_or_else(|| Error::not_found(format!("exercise {id}")))?;
    Ok(Json(updated))
}

pub async fn delete_exercise(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    user.require_admin()?;
    state.catalog.delete_exercise(&id).await?;
    tracing::info!(exercise = %id, "exercise deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_exercises(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(entries): Json<Vec<ReorderEntry>>,
) -> Result<StatusCode> {
    user.require_admin()?;
    state.catalog.reorder_exercises(&entries).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn validate_exercise_data(state: &AppState, data: &ExerciseData) -> Result<()> {
    if !valid_exercise_id(&data.id) {
        return Err(Error::validation(format!(
            "exercise id must match [a-z0-9-]+: {}",
            data.id
        )));
    }
    if state.catalog.get_chapter(&data.chapter_id).await?.is_none() {
        return Err(Error::validation(format!(
            "chapter {} does not exist",
            data.chapter_id
        )));
    }
    Ok(())
}

// ----- diagnostics -----

#[derive(Deserialize)]
pub struct TestSolutionRequest {
    pub solution: String,
    pub language: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSolutionResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i64>,
    pub timed_out: bool,
    pub error: Option<String>,
}

/// Run a reference solution once, without test cases or persisted progress.
pub async fn test_solution(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<TestSolutionRequest>,
) -> Result<Json<TestSolutionResponse>> {
    user.require_admin()?;
    let run = state
        .grader
        .test_solution(&body.solution, &body.language)
        .await?;
    Ok(Json(TestSolutionResponse {
        stdout: run.stdout,
        stderr: run.stderr,
        exit_code: run.exit_code,
        timed_out: run.timed_out,
        error: run.error,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTestCaseRequest {
    pub solution: String,
    pub language: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub fixtures: Vec<String>,
    #[serde(default)]
    pub output_files: HashMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTestCaseResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i64>,
    pub timed_out: bool,
    pub error: Option<String>,
    pub output_files: Vec<FileCheck>,
}

/// Run one ad-hoc test case and report the produced-file hashes.
pub async fn run_test_case(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<RunTestCaseRequest>,
) -> Result<Json<RunTestCaseResponse>> {
    user.require_admin()?;
    let (run, output_files) = state
        .grader
        .run_single_case(
            &body.solution,
            &body.language,
            &body.arguments,
            &body.input,
            &body.fixtures,
            &body.output_files,
        )
        .await?;
    Ok(Json(RunTestCaseResponse {
        stdout: run.stdout,
        stderr: run.stderr,
        exit_code: run.exit_code,
        timed_out: run.timed_out,
        error: run.error,
        output_files,
    }))
}

// ----- languages -----

pub async fn create_language(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(language): Json<Language>,
) -> Result<Json<Language>> {
    user.require_admin()?;
    if language.id.is_empty() {
        return Err(Error::validation("language id must not be empty"));
    }
    state.catalog.create_language(&language).await?;
    tracing::info!(language = %language.id, "language created");
    Ok(Json(language))
}

pub async fn update_language(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(mut language): Json<Language>,
) -> Result<Json<Language>> {
    user.require_admin()?;
    language.id = id;
    state.catalog.update_language(&language).await?;
    Ok(Json(language))
}

pub async fn delete_language(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    user.require_admin()?;
    state.catalog.delete_language(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- chapters -----

pub async fn create_chapter(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(chapter): Json<Chapter>,
) -> Result<Json<Chapter>> {
    user.require_admin()?;
    if chapter.id.is_empty() {
        return Err(Error::validation("chapter id must not be empty"));
    }
    if state
        .catalog
        .get_language(&chapter.language_id)
        .await?
        .is_none()
    {
        return Err(Error::validation(format!(
            "language {} does not exist",
            chapter.language_id
        )));
    }
    state.catalog.create_chapter(&chapter).await?;
    tracing::info!(chapter = %chapter.id, "chapter created");
    Ok(Json(chapter))
}

pub async fn update_chapter(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(mut chapter): Json<Chapter>,
) -> Result<Json<Chapter>> {
    user.require_admin()?;
    chapter.id = id;
    state.catalog.update_chapter(&chapter).await?;
    Ok(Json(chapter))
}

pub async fn delete_chapter(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    user.require_admin()?;
    state.catalog.delete_chapter(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
