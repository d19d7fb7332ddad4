use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog entry for one exercise. Test cases are loaded separately; public
/// listings never include `solution`.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Exercise {
    pub id: String,
    pub chapter_id: String,
    pub title: String,
    pub description: String,
    pub solution: String,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One invocation specification used to judge a submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub exercise_id: String,
    pub order_index: i64,
    pub args: Vec<String>,
    pub stdin_lines: Vec<String>,
    pub expected_stdout: String,
    pub expected_stderr: Option<String>,
    pub expected_exit_code: i64,
    pub fixtures: Vec<String>,
    /// Expected SHA-256 hex digests of files the submission must produce,
    /// keyed by workspace-relative file name.
    pub output_files: HashMap<String, String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExerciseWithTests {
    #[serde(flatten)]
    pub exercise: Exercise,
    pub test_cases: Vec<TestCase>,
}

/// Input payload for exercise create/update. Test cases are replaced
/// wholesale; order follows the input sequence.
#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseData {
    pub id: String,
    pub chapter_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub test_cases: Vec<TestCaseData>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TestCaseData {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub stdin_lines: Vec<String>,
    #[serde(default)]
    pub expected_stdout: String,
    #[serde(default)]
    pub expected_stderr: Option<String>,
    #[serde(default)]
    pub expected_exit_code: i64,
    #[serde(default)]
    pub fixtures: Vec<String>,
    #[serde(default)]
    pub output_files: HashMap<String, String>,
}

/// Exercise identifiers are URL segments; keep them lowercase and dash-safe.
pub fn valid_exercise_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
