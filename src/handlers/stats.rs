//! Current-user statistics, identity echo, and the achievement catalog.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::middleware::auth::{CurrentUser, MaybeUser};
use crate::models::{Achievement, Statistics, User, UserProgress};
use crate::services::AppState;

#[derive(Serialize)]
pub struct UserResponse {
    pub authenticated: bool,
    pub user: Option<User>,
}

pub async fn get_user(MaybeUser(user): MaybeUser) -> Json<UserResponse> {
    Json(UserResponse {
        authenticated: user.is_some(),
        user,
    })
}

pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Statistics>> {
    Ok(Json(state.progress.statistics(&user.id).await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStatistics {
    pub statistics: Statistics,
    /// Grading history for this exercise, including the last submission so
    /// the editor can restore it. Absent when never attempted.
    pub progress: Option<UserProgress>,
}

pub async fn get_exercise_statistics(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(exercise_id): Path<String>,
) -> Result<Json<ExerciseStatistics>> {
    let statistics = state.progress.statistics(&user.id).await?;
    let progress = state
        .progress
        .exercise_progress(&user.id, &exercise_id)
        .await?;
    Ok(Json(ExerciseStatistics {
        statistics,
        progress,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub earned_at: Option<DateTime<Utc>>,
}

/// Achievement catalog; earned timestamps are filled in for authenticated
/// requests.
pub async fn list_achievements(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<Vec<AchievementView>>> {
    let earned: HashMap<String, DateTime<Utc>> = match &user {
        Some(user) => state
            .achievements
            .list_for_user(&user.id)
            .await?
            .into_iter()
            .map(|ua| (ua.achievement_id, ua.earned_at))
            .collect(),
        None => HashMap::new(),
    };

    let views = state
        .achievements
        .list()
        .await?
        .into_iter()
        .map(|achievement| AchievementView {
            earned_at: earned.get(&achievement.id).copied(),
            achievement,
        })
        .collect();
    Ok(Json(views))
}
