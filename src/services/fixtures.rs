//! Content-addressed fixture library.
//!
//! Logical paths mirror the physical tree under the fixtures root. Writers
//! serialize on a store-wide lock and go through write-to-temp-then-rename,
//! so concurrent readers observe either the old or the new content, never a
//! partial file.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::fixture::{parse_permissions, valid_fixture_path, Fixture, FixtureKind};
use crate::sandbox::workspace;

const DEFAULT_FILE_PERMISSIONS: &str = "rw-r--r--";
const DEFAULT_FOLDER_PERMISSIONS: &str = "rwxr-xr-x";

pub struct FixtureStore {
    root: PathBuf,
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

#[derive(sqlx::FromRow)]
struct FixtureRow {
    path: String,
    kind: String,
    size: i64,
    permissions: String,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl FixtureRow {
    fn into_fixture(self) -> Fixture {
        Fixture {
            path: self.path,
            kind: FixtureKind::from_str(&self.kind).unwrap_or(FixtureKind::File),
            size: self.size,
            permissions: self.permissions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl FixtureStore {
    pub async fn new(root: PathBuf, pool: SqlitePool) -> Result<Self> {
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            pool,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn disk_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn validate(path: &str) -> Result<()> {
        if valid_fixture_path(path) {
            Ok(())
        } else {
            Err(Error::validation(format!("invalid fixture path: {path}")))
        }
    }

    fn validate_permissions(permissions: &str) -> Result<u32> {
        parse_permissions(permissions)
            .ok_or_else(|| Error::validation(format!("invalid permissions: {permissions}")))
    }

    pub async fn list(&self) -> Result<Vec<Fixture>> {
        let rows = sqlx::query_as::<_, FixtureRow>("SELECT * FROM fixtures ORDER BY path")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(FixtureRow::into_fixture).collect())
    }

    pub async fn get(&self, path: &str) -> Result<Fixture> {
        Self::validate(path)?;
        self.find(path)
            .await?
            .ok_or_else(|| Error::not_found(format!("fixture {path}")))
    }

    async fn find(&self, path: &str) -> Result<Option<Fixture>> {
        let row = sqlx::query_as::<_, FixtureRow>("SELECT * FROM fixtures WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(FixtureRow::into_fixture))
    }

    /// File content as stored on disk.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let fixture = self.get(path).await?;
        if fixture.kind != FixtureKind::File {
            return Err(Error::validation(format!("{path} is a folder")));
        }
        Ok(tokio::fs::read(self.disk_path(path)).await?)
    }

    pub async fn put(
        &self,
        path: &str,
        kind: FixtureKind,
        content: Option<&[u8]>,
        permissions: Option<&str>,
    ) -> Result<Fixture> {
        Self::validate(path)?;
        let permissions = permissions.unwrap_or(match kind {
            FixtureKind::File => DEFAULT_FILE_PERMISSIONS,
            FixtureKind::Folder => DEFAULT_FOLDER_PERMISSIONS,
        });
        let mode = Self::validate_permissions(permissions)?;

        let _guard = self.write_lock.lock().await;
        let disk = self.disk_path(path);
        let size = match kind {
            FixtureKind::Folder => {
                tokio::fs::create_dir_all(&disk).await?;
                0
            }
            FixtureKind::File => {
                let body = content.unwrap_or_default();
                if let Some(parent) = disk.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                write_atomic(&disk, body).await?;
                body.len() as i64
            }
        };
        tokio::fs::set_permissions(&disk, std::fs::Permissions::from_mode(mode)).await?;

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO fixtures (path, kind, size, permissions, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(path) DO UPDATE SET kind = excluded.kind, size = excluded.size, \
             permissions = excluded.permissions, updated_at = excluded.updated_at",
        )
        .bind(path)
        .bind(kind.as_str())
        .bind(size)
        .bind(permissions)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(fixture = %path, kind = kind.as_str(), "fixture stored");
        self.get(path).await
    }

    /// Deleting a folder removes every descendant record and the physical
    /// subtree.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let fixture = self.get(path).await?;

        let _guard = self.write_lock.lock().await;
        let disk = self.disk_path(path);
        match fixture.kind {
            FixtureKind::Folder => {
                if disk.exists() {
                    tokio::fs::remove_dir_all(&disk).await?;
                }
                sqlx::query("DELETE FROM fixtures WHERE path = ? OR path LIKE ?")
                    .bind(path)
                    .bind(format!("{path}/%"))
                    .execute(&self.pool)
                    .await?;
            }
            FixtureKind::File => {
                if disk.exists() {
                    tokio::fs::remove_file(&disk).await?;
                }
                sqlx::query("DELETE FROM fixtures WHERE path = ?")
                    .bind(path)
                    .execute(&self.pool)
                    .await?;
            }
        }

        tracing::info!(fixture = %path, "fixture deleted");
        Ok(())
    }

    pub async fn set_permissions(&self, path: &str, permissions: &str) -> Result<Fixture> {
        let mode = Self::validate_permissions(permissions)?;
        let fixture = self.get(path).await?;

        let _guard = self.write_lock.lock().await;
        let disk = self.disk_path(&fixture.path);
        if disk.exists() {
            tokio::fs::set_permissions(&disk, std::fs::Permissions::from_mode(mode)).await?;
        }
        sqlx::query("UPDATE fixtures SET permissions = ?, updated_at = ? WHERE path = ?")
            .bind(permissions)
            .bind(Utc::now())
            .bind(&fixture.path)
            .execute(&self.pool)
            .await?;

        self.get(path).await
    }

    pub async fn list_folder(&self, folder: &str) -> Result<Vec<Fixture>> {
        let fixture = self.get(folder).await?;
        if fixture.kind != FixtureKind::Folder {
            return Err(Error::validation(format!("{folder} is not a folder")));
        }
        let rows = sqlx::query_as::<_, FixtureRow>(
            "SELECT * FROM fixtures WHERE path LIKE ? ORDER BY path",
        )
        .bind(format!("{folder}/%"))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(FixtureRow::into_fixture).collect())
    }

    pub async fn put_in_folder(
        &self,
        folder: &str,
        name: &str,
        content: &[u8],
    ) -> Result<Fixture> {
        if name.contains('/') {
            return Err(Error::validation(format!("invalid file name: {name}")));
        }
        let parent = self.get(folder).await?;
        if parent.kind != FixtureKind::Folder {
            return Err(Error::validation(format!("{folder} is not a folder")));
        }
        self.put(
            &format!("{folder}/{name}"),
            FixtureKind::File,
            Some(content),
            None,
        )
        .await
    }

    pub async fn delete_in_folder(&self, folder: &str, name: &str) -> Result<()> {
        if name.contains('/') {
            return Err(Error::validation(format!("invalid file name: {name}")));
        }
        self.delete(&format!("{folder}/{name}")).await
    }

    /// Drop catalog entries whose physical asset disappeared; returns the
    /// removed paths.
    pub async fn sync_with_storage(&self) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        let mut removed = Vec::new();
        for fixture in self.list().await? {
            if !self.disk_path(&fixture.path).exists() {
                sqlx::query("DELETE FROM fixtures WHERE path = ?")
                    .bind(&fixture.path)
                    .execute(&self.pool)
                    .await?;
                tracing::warn!(fixture = %fixture.path, "catalog entry dropped, asset missing");
                removed.push(fixture.path);
            }
        }
        Ok(removed)
    }

    /// Materialize one fixture into a workspace, preserving the relative
    /// layout. Returns the top-level workspace entry name, or `None` when the
    /// fixture is unknown or its asset is gone.
    pub async fn stage_into(&self, ws: &Path, path: &str) -> Result<Option<String>> {
        Self::validate(path)?;
        let Some(fixture) = self.find(path).await? else {
            return Ok(None);
        };
        let src = self.disk_path(path);
        if !src.exists() {
            return Ok(None);
        }

        let dst = ws.join(path);
        match fixture.kind {
            FixtureKind::File => {
                if let Some(parent) = dst.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::copy(&src, &dst).await?;
                let mode = match parse_permissions(&fixture.permissions) {
                    Some(mode) => mode,
                    None => tokio::fs::metadata(&src).await?.permissions().mode(),
                };
                tokio::fs::set_permissions(&dst, std::fs::Permissions::from_mode(mode)).await?;
            }
            FixtureKind::Folder => {
                workspace::copy_dir_all(&src, &dst).await?;
                if let Some(mode) = parse_permissions(&fixture.permissions) {
                    tokio::fs::set_permissions(&dst, std::fs::Permissions::from_mode(mode))
                        .await?;
                }
            }
        }

        let top = path.split('/').next().unwrap_or(path).to_string();
        tracing::debug!(fixture = %path, "fixture staged");
        Ok(Some(top))
    }
}

async fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let tmp = path.with_extension(format!("tmp-{suffix}"));
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
