//! Admin fixture management.
//!
//! File content crosses the API base64-encoded; on disk it is stored
//! verbatim under the fixtures root.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::{Fixture, FixtureKind};
use crate::services::AppState;

fn decode_content(content: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(content)
        .map_err(|_| Error::validation("content is not valid base64"))
}

pub async fn list_fixtures(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<Fixture>>> {
    user.require_admin()?;
    Ok(Json(state.fixtures.list().await?))
}

#[derive(Serialize)]
pub struct FixtureResponse {
    #[serde(flatten)]
    pub fixture: Fixture,
    /// Base64 file content; absent for folders.
    pub content: Option<String>,
}

pub async fn get_fixture(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(path): Path<String>,
) -> Result<Json<FixtureResponse>> {
    user.require_admin()?;
    let fixture = state.fixtures.get(&path).await?;
    let content = match fixture.kind {
        FixtureKind::File => {
            let bytes = state.fixtures.read(&path).await?;
            Some(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        FixtureKind::Folder => None,
    };
    Ok(Json(FixtureResponse { fixture, content }))
}

#[derive(Deserialize)]
pub struct PutFixtureRequest {
    pub path: String,
    pub kind: FixtureKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub permissions: Option<String>,
}

pub async fn put_fixture(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<PutFixtureRequest>,
) -> Result<Json<Fixture>> {
    user.require_admin()?;
    let content = body.content.as_deref().map(decode_content).transpose()?;
    let fixture = state
        .fixtures
        .put(
            &body.path,
            body.kind,
            content.as_deref(),
            body.permissions.as_deref(),
        )
        .await?;
    Ok(Json(fixture))
}

pub async fn delete_fixture(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(path): Path<String>,
) -> Result<StatusCode> {
    user.require_admin()?;
    state.fixtures.delete(&path).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SetPermissionsRequest {
    pub permissions: String,
}

pub async fn set_permissions(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(path): Path<String>,
    Json(body): Json<SetPermissionsRequest>,
) -> Result<Json<Fixture>> {
    user.require_admin()?;
    let fixture = state
        .fixtures
        .set_permissions(&path, &body.permissions)
        .await?;
    Ok(Json(fixture))
}

pub async fn folder_contents(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(folder): Path<String>,
) -> Result<Json<Vec<Fixture>>> {
    user.require_admin()?;
    Ok(Json(state.fixtures.list_folder(&folder).await?))
}

#[derive(Deserialize)]
pub struct PutFolderFileRequest {
    pub name: String,
    pub content: String,
}

pub async fn put_folder_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(folder): Path<String>,
    Json(body): Json<PutFolderFileRequest>,
) -> Result<Json<Fixture>> {
    user.require_admin()?;
    let content = decode_content(&body.content)?;
    let fixture = state
        .fixtures
        .put_in_folder(&folder, &body.name, &content)
        .await?;
    Ok(Json(fixture))
}

pub async fn delete_folder_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((folder, name)): Path<(String, String)>,
) -> Result<StatusCode> {
    user.require_admin()?;
    state.fixtures.delete_in_folder(&folder, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub removed: Vec<String>,
}

/// Reconcile the catalog with physical storage; returns dropped entries.
pub async fn sync(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<SyncResponse>> {
    user.require_admin()?;
    let removed = state.fixtures.sync_with_storage().await?;
    Ok(Json(SyncResponse { removed }))
}
