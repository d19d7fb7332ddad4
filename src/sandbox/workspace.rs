//! Workspace staging and cleanup.
//!
//! Each run owns a fresh directory under the temp root. Host-side modes are
//! permissive (0777); isolation comes from the container, not the host
//! directory.

use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::{Error, Result};

/// Allocate a fresh workspace directory. A name collision is cleared and
/// retried once before giving up.
pub async fn create(temp_root: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(temp_root).await?;

    let path = temp_root.join(random_name());
    for attempt in 0..2 {
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {
                let perms = std::fs::Permissions::from_mode(0o777);
                tokio::fs::set_permissions(&path, perms).await?;
                tracing::debug!(workspace = %path.display(), "workspace created");
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt == 0 => {
                tokio::fs::remove_dir_all(&path).await.map_err(|e| {
                    Error::WorkspaceSetup(format!(
                        "cannot clear stale workspace {}: {e}",
                        path.display()
                    ))
                })?;
            }
            Err(e) => {
                return Err(Error::WorkspaceSetup(format!(
                    "cannot create workspace {}: {e}",
                    path.display()
                )));
            }
        }
    }
    Err(Error::WorkspaceSetup(format!(
        "workspace path {} busy",
        path.display()
    )))
}

fn random_name() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("ws-{}", suffix.to_lowercase())
}

/// Write the submission verbatim, CRLFs collapsed to LFs, mode 0777.
pub async fn write_script(workspace: &Path, file_name: &str, script: &str) -> Result<()> {
    let path = workspace.join(file_name);
    let body = crate::sandbox::normalize_newlines(script);
    tokio::fs::write(&path, body).await.map_err(|e| {
        Error::WorkspaceSetup(format!("cannot write {}: {e}", path.display()))
    })?;
    tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o777)).await?;
    Ok(())
}

/// Delete every workspace entry whose name is not protected. Files are
/// unlinked, directories removed recursively.
pub async fn sweep(workspace: &Path, protected: &HashSet<String>) -> Result<()> {
    let mut entries = tokio::fs::read_dir(workspace).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if protected.contains(&name) {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        tracing::debug!(entry = %path.display(), "workspace entry swept");
    }
    Ok(())
}

/// Remove the workspace. Failures are logged, never surfaced: release runs
/// on cleanup paths where the verdict is already decided.
pub async fn release(workspace: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(workspace).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(workspace = %workspace.display(), error = %e, "workspace release failed");
        }
    }
}

/// Recursive copy preserving relative layout and file modes.
pub async fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir_all(&to).await?;
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let from_path = entry.path();
            let to_path = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((from_path, to_path));
            } else {
                tokio::fs::copy(&from_path, &to_path).await?;
                let mode = entry.metadata().await?.permissions().mode();
                tokio::fs::set_permissions(&to_path, std::fs::Permissions::from_mode(mode))
                    .await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_allocates_unique_dirs() {
        let root = tempfile::tempdir().unwrap();
        let a = create(root.path()).await.unwrap();
        let b = create(root.path()).await.unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir());
        assert!(b.is_dir());
    }

    #[tokio::test]
    async fn write_script_collapses_crlf() {
        let root = tempfile::tempdir().unwrap();
        let ws = create(root.path()).await.unwrap();
        write_script(&ws, "script.sh", "echo hi\r\necho bye\r\n")
            .await
            .unwrap();
        let body = tokio::fs::read_to_string(ws.join("script.sh")).await.unwrap();
        assert_eq!(body, "echo hi\necho bye\n");
        let mode = std::fs::metadata(ws.join("script.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    #[tokio::test]
    async fn sweep_keeps_protected_entries() {
        let root = tempfile::tempdir().unwrap();
        let ws = create(root.path()).await.unwrap();
        tokio::fs::write(ws.join("script.sh"), "echo hi").await.unwrap();
        tokio::fs::write(ws.join("residue.txt"), "junk").await.unwrap();
        tokio::fs::create_dir(ws.join("outdir")).await.unwrap();
        tokio::fs::write(ws.join("outdir/file"), "junk").await.unwrap();

        let protected = HashSet::from(["script.sh".to_string()]);
        sweep(&ws, &protected).await.unwrap();

        assert!(ws.join("script.sh").exists());
        assert!(!ws.join("residue.txt").exists());
        assert!(!ws.join("outdir").exists());
    }

    #[tokio::test]
    async fn release_is_silent_on_missing_dir() {
        let root = tempfile::tempdir().unwrap();
        let ws = create(root.path()).await.unwrap();
        release(&ws).await;
        assert!(!ws.exists());
        // Second release of the same path must not panic or log an error.
        release(&ws).await;
    }
}
