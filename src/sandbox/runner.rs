//! Container invocation.
//!
//! One call, one container: no network, memory and pid caps, the workspace
//! bind-mounted read-write at /workspace, entrypoint overridden to a minimal
//! shell running `<interpreter> ./script.<ext> "$@"`. A global semaphore
//! bounds concurrent active containers.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::Language;
use crate::repository::CatalogRepository;
use crate::sandbox::{normalize_newlines, runtime, workspace, RunResult};
use crate::services::fixtures::FixtureStore;

pub struct SandboxRunner {
    config: Config,
    catalog: CatalogRepository,
    fixtures: Arc<FixtureStore>,
    semaphore: Arc<Semaphore>,
}

impl SandboxRunner {
    pub fn new(config: Config, catalog: CatalogRepository, fixtures: Arc<FixtureStore>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_executions.max(1)));
        Self {
            config,
            catalog,
            fixtures,
            semaphore,
        }
    }

    pub async fn resolve_language(&self, language_id: &str) -> Result<Language> {
        self.catalog
            .get_language(language_id)
            .await?
            .ok_or_else(|| Error::UnknownLanguage(language_id.to_string()))
    }

    /// Allocate a workspace holding only the submission script.
    pub async fn prepare_workspace(&self, language: &Language, script: &str) -> Result<PathBuf> {
        let ws = workspace::create(&self.config.temp_root).await?;
        workspace::write_script(&ws, &language.script_file(), script).await?;
        Ok(ws)
    }

    /// Materialize fixtures into the workspace. Missing or broken fixtures
    /// are logged and skipped; the returned names are the entries actually
    /// staged (top-level workspace names).
    pub async fn stage_fixtures(&self, ws: &Path, refs: &[String]) -> Vec<String> {
        let mut staged = Vec::new();
        for fixture_ref in refs {
            match self.fixtures.stage_into(ws, fixture_ref).await {
                Ok(Some(name)) => staged.push(name),
                Ok(None) => {
                    tracing::warn!(fixture = %fixture_ref, "fixture missing, skipped");
                }
                Err(e) => {
                    tracing::warn!(fixture = %fixture_ref, error = %e, "fixture staging failed, skipped");
                }
            }
        }
        staged
    }

    /// Execute one (script, args, stdin) tuple in a prepared workspace and
    /// return a structured result. Failures specific to this run (spawn
    /// error, signal) are data inside the result; only an absent container
    /// runtime or a closed engine surface as `Err`.
    pub async fn execute(
        &self,
        ws: &Path,
        language: &Language,
        args: &[String],
        stdin_lines: &[String],
        timeout: Duration,
    ) -> Result<RunResult> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("execution semaphore closed".into()))?;
        let runtime = runtime::container_runtime()?;

        let handle = format!("cf-run-{}", Uuid::new_v4().simple());
        let image = language.image_ref(&self.config.execution_image_tag);
        let shell_command = format!("{} ./{} \"$@\"", language.interpreter, language.script_file());

        let mut command = Command::new(runtime);
        command
            .arg("run")
            .arg("--rm")
            .arg("--name")
            .arg(&handle)
            .arg("--network")
            .arg("none")
            .arg("--memory")
            .arg(&self.config.container_memory_cap)
            .arg("--pids-limit")
            .arg(self.config.container_pids_cap.to_string())
            .arg("-i")
            .arg("-v")
            .arg(format!("{}:/workspace", ws.display()))
            .arg("-w")
            .arg("/workspace")
            .arg("--entrypoint")
            .arg("/bin/sh")
            .arg(&image)
            .arg("-c")
            .arg(&shell_command)
            .arg("sh")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if stdin_lines.is_empty() {
            command.stdin(Stdio::null());
        } else {
            command.stdin(Stdio::piped());
        }

        tracing::debug!(container = %handle, image = %image, "launching container");

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(container = %handle, error = %e, "container spawn failed");
                return Ok(RunResult {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: None,
                    timed_out: false,
                    error: Some(format!("failed to spawn container: {e}")),
                    workspace: ws.to_path_buf(),
                });
            }
        };

        // Readers start before stdin is fed so a chatty child can never fill
        // its stdout pipe while waiting on input.
        let stdout_task = spawn_reader(child.stdout.take());
        let stderr_task = spawn_reader(child.stderr.take());

        if !stdin_lines.is_empty() {
            if let Some(mut stdin) = child.stdin.take() {
                let body = format!("{}\n", stdin_lines.join("\n"));
                // The child may exit before consuming stdin; a broken pipe
                // here is not an engine failure.
                let _ = stdin.write_all(body.as_bytes()).await;
                let _ = stdin.shutdown().await;
            }
        }

        let (timed_out, exit_code, error) =
            match tokio::time::timeout(timeout, child.wait()).await {
                Ok(Ok(status)) => match status.code() {
                    Some(code) => (false, Some(i64::from(code)), None),
                    None => (false, None, Some("terminated by signal".to_string())),
                },
                Ok(Err(e)) => (false, None, Some(format!("wait failed: {e}"))),
                Err(_) => {
                    tracing::debug!(container = %handle, "timeout, killing container");
                    let _ = Command::new(runtime)
                        .arg("kill")
                        .arg(&handle)
                        .output()
                        .await;
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    (true, Some(-1), None)
                }
            };

        let stdout = drain_reader(stdout_task).await;
        let stderr = drain_reader(stderr_task).await;

        Ok(RunResult {
            stdout: normalize_newlines(&stdout),
            stderr: normalize_newlines(&stderr),
            exit_code,
            timed_out,
            error,
            workspace: ws.to_path_buf(),
        })
    }

    /// One-shot run: stage a fresh workspace with fixtures, execute, keep the
    /// workspace for inspection. The caller must `release` it.
    pub async fn run(
        &self,
        script: &str,
        language_id: &str,
        args: &[String],
        stdin_lines: &[String],
        fixture_refs: &[String],
        timeout: Duration,
    ) -> Result<RunResult> {
        let language = self.resolve_language(language_id).await?;
        let ws = self.prepare_workspace(&language, script).await?;
        self.stage_fixtures(&ws, fixture_refs).await;

        match self.execute(&ws, &language, args, stdin_lines, timeout).await {
            Ok(result) => Ok(result),
            Err(e) => {
                workspace::release(&ws).await;
                Err(e)
            }
        }
    }

    pub async fn release(&self, ws: &Path) {
        workspace::release(ws).await;
    }

    pub fn default_timeout(&self) -> Duration {
        self.config.per_test_timeout
    }
}

fn spawn_reader<R>(reader: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    reader.map(|mut r| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf).await;
            buf
        })
    })
}

async fn drain_reader(task: Option<JoinHandle<Vec<u8>>>) -> String {
    match task {
        Some(task) => String::from_utf8_lossy(&task.await.unwrap_or_default()).into_owned(),
        None => String::new(),
    }
}
