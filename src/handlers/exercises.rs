//! Public catalog and grading endpoints.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::middleware::auth::{CurrentUser, MaybeUser};
use crate::models::{Achievement, Chapter, Language, Statistics};
use crate::services::comparator::TestResult;
use crate::services::AppState;

#[derive(Serialize)]
pub struct LanguageListing {
    #[serde(flatten)]
    pub language: Language,
    pub chapters: Vec<Chapter>,
}

/// Enabled languages with their chapters, in display order.
pub async fn list_languages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LanguageListing>>> {
    let mut listings = Vec::new();
    for language in state.catalog.list_languages().await? {
        if !language.enabled {
            continue;
        }
        let chapters = state.catalog.list_chapters(&language.id).await?;
        listings.push(LanguageListing { language, chapters });
    }
    Ok(Json(listings))
}

#[derive(Deserialize)]
pub struct ListExercisesQuery {
    pub language: String,
}

/// Public exercise metadata: no reference solutions, no test cases.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseMeta {
    pub id: String,
    pub chapter_id: String,
    pub title: String,
    pub description: String,
    pub order_index: i64,
    pub completed: bool,
}

pub async fn list_exercises(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<ListExercisesQuery>,
) -> Result<Json<Vec<ExerciseMeta>>> {
    let completed: HashSet<String> = match &user {
        Some(user) => state
            .progress
            .completed_exercise_ids_for(&user.id)
            .await?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let exercises = state.catalog.list_exercises(&query.language).await?;
    let metas = exercises
        .into_iter()
        .map(|e| ExerciseMeta {
            completed: completed.contains(&e.id),
            id: e.id,
            chapter_id: e.chapter_id,
            title: e.title,
            description: e.description,
            order_index: e.order_index,
        })
        .collect();
    Ok(Json(metas))
}

pub async fn get_exercise(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<ExerciseMeta>> {
    let exercise = state
        .catalog
        .get_exercise(&id)
        .await?
        .ok_or_else(|| Error::not_found(format!("exercise {id}")))?;

    let completed = match &user {
        Some(user) => state
            .progress
            .exercise_progress(&user.id, &id)
            .await?
            .map(|p| p.completed)
            .unwrap_or(false),
        None => false,
    };

    Ok(Json(ExerciseMeta {
        completed,
        id: exercise.id,
        chapter_id: exercise.chapter_id,
        title: exercise.title,
        description: exercise.description,
        order_index: exercise.order_index,
    }))
}

#[derive(Deserialize)]
pub struct RunRequest {
    pub script: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub results: Vec<TestResult>,
    pub statistics: Statistics,
    pub new_achievements: Vec<Achievement>,
}

/// Grade a submission. Grading runs on a detached task: an aborted request
/// does not cancel in-flight containers, and the attempt is recorded before
/// the response is produced.
pub async fn run_exercise(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<RunRequest>,
) -> Result<Json<RunResponse>> {
    if body.script.trim().is_empty() {
        return Err(Error::validation("script must not be empty"));
    }

    let exercise = state
        .catalog
        .get_exercise_with_tests(&id)
        .await?
        .ok_or_else(|| Error::not_found(format!("exercise {id}")))?;
    if exercise.test_cases.is_empty() {
        return Err(Error::validation(format!(
            "exercise {id} has no test cases"
        )));
    }

    let chapter = state
        .catalog
        .get_chapter(&exercise.exercise.chapter_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("exercise {id} has no chapter")))?;
    let language_id = chapter.language_id;

    let grader = state.grader.clone();
    let script = body.script.clone();
    let task = tokio::spawn(async move {
        grader.grade(&exercise, &script, &language_id).await
    });
    let results = task
        .await
        .map_err(|e| Error::Internal(format!("grading task failed: {e}")))??;

    let all_passed = results.iter().all(|r| r.passed);

    // The grade is authoritative; a recording failure must not fail the
    // response.
    let new_achievements = match state
        .progress
        .record_attempt(&user.id, &id, all_passed, &body.script)
        .await
    {
        Ok(earned) => earned,
        Err(e) => {
            tracing::warn!(user = %user.id, exercise = %id, error = %e, "progress recording failed");
            Vec::new()
        }
    };

    let statistics = state.progress.statistics(&user.id).await.unwrap_or_default();

    Ok(Json(RunResponse {
        results,
        statistics,
        new_achievements,
    }))
}
