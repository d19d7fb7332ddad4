//! Admin user management.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::{Statistics, User};
use crate::repository::user_repo::UserSummary;
use crate::services::AppState;

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<UserSummary>>> {
    user.require_admin()?;
    Ok(Json(state.users.list().await?))
}

#[derive(Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub statistics: Statistics,
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    admin: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<UserDetail>> {
    admin.require_admin()?;
    let user = state
        .users
        .get(&id)
        .await?
        .ok_or_else(|| Error::not_found(format!("user {id}")))?;
    let statistics = state.progress.statistics(&id).await?;
    Ok(Json(UserDetail { user, statistics }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub is_admin: bool,
}

/// Promote or demote a user.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    admin: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    admin.require_admin()?;
    state.users.set_admin(&id, body.is_admin).await?;
    let user = state
        .users
        .get(&id)
        .await?
        .ok_or_else(|| Error::not_found(format!("user {id}")))?;
    tracing::info!(user = %id, is_admin = body.is_admin, "user admin flag changed");
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    admin: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    admin.require_admin()?;
    state.users.delete(&id).await?;
    tracing::info!(user = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
