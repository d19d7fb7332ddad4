//! Isolated execution of submissions.
//!
//! A run stages a workspace under the configured temp root, launches the
//! submission inside a no-network container with memory and pid caps, and
//! captures its observable effects. The workspace outlives the run so
//! callers can inspect produced files; they must release it.

pub mod runner;
pub mod runtime;
pub mod workspace;

use std::path::PathBuf;

use serde::Serialize;

pub use runner::SandboxRunner;

/// Captured outcome of one container run.
///
/// `exit_code` is `Some(-1)` on timeout and `None` when the engine itself
/// failed (spawn error, runtime missing mid-flight); `error` carries the
/// cause in the latter case. Streams are newline-normalized, never trimmed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i64>,
    pub timed_out: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pub workspace: PathBuf,
}

/// Replace every CRLF with LF. No trimming.
pub fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n")
}
