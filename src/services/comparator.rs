//! Verdict computation for one executed test case.
//!
//! A case passes when the run finished in time, the exit code matches, both
//! normalized-and-trimmed streams match, and every expected output file
//! exists with the expected SHA-256 digest.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::TestCase;
use crate::sandbox::{normalize_newlines, RunResult};

/// One expected-output-file comparison.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCheck {
    pub name: String,
    pub expected: String,
    pub actual: Option<String>,
    pub exists: bool,
    pub size: Option<u64>,
    pub error: Option<String>,
}

impl FileCheck {
    pub fn matches(&self) -> bool {
        self.exists && self.actual.as_deref() == Some(self.expected.as_str())
    }
}

/// Verdict for one test case, with observed outputs echoed back.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub index: i64,
    pub args: Vec<String>,
    pub expected_stdout: String,
    pub actual_stdout: String,
    pub expected_stderr: String,
    pub actual_stderr: String,
    pub expected_exit_code: i64,
    pub actual_exit_code: Option<i64>,
    pub output_files: Vec<FileCheck>,
    pub error: Option<String>,
    pub timed_out: bool,
    pub passed: bool,
}

/// Compare streams after normalization and trimming: a trailing-newline or
/// CRLF-vs-LF difference is not a failure.
pub fn streams_match(actual: &str, expected: &str) -> bool {
    normalize_newlines(actual).trim() == normalize_newlines(expected).trim()
}

pub fn evaluate(
    index: i64,
    case: &TestCase,
    run: &RunResult,
    output_files: Vec<FileCheck>,
) -> TestResult {
    let expected_stderr = case.expected_stderr.clone().unwrap_or_default();

    let passed = !run.timed_out
        && run.error.is_none()
        && run.exit_code == Some(case.expected_exit_code)
        && streams_match(&run.stdout, &case.expected_stdout)
        && streams_match(&run.stderr, &expected_stderr)
        && output_files.iter().all(FileCheck::matches);

    TestResult {
        index,
        args: case.args.clone(),
        expected_stdout: case.expected_stdout.clone(),
        actual_stdout: run.stdout.clone(),
        expected_stderr,
        actual_stderr: run.stderr.clone(),
        expected_exit_code: case.expected_exit_code,
        actual_exit_code: run.exit_code,
        output_files,
        error: run.error.clone(),
        timed_out: run.timed_out,
        passed,
    }
}

/// Hash every expected output file found in the workspace after a run.
pub async fn check_output_files(
    ws: &Path,
    expectations: &HashMap<String, String>,
) -> Vec<FileCheck> {
    let mut names: Vec<&String> = expectations.keys().collect();
    names.sort();

    let mut checks = Vec::with_capacity(names.len());
    for name in names {
        let expected = expectations[name].clone();
        let path = ws.join(name);
        let check = match tokio::fs::read(&path).await {
            Ok(bytes) => FileCheck {
                name: name.clone(),
                expected,
                actual: Some(sha256_hex(&bytes)),
                exists: true,
                size: Some(bytes.len() as u64),
                error: None,
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileCheck {
                name: name.clone(),
                expected,
                actual: None,
                exists: false,
                size: None,
                error: None,
            },
            Err(e) => FileCheck {
                name: name.clone(),
                expected,
                actual: None,
                exists: path.exists(),
                size: None,
                error: Some(e.to_string()),
            },
        };
        checks.push(check);
    }
    checks
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
