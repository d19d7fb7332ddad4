//! Shared test setup: file-backed SQLite in a temp dir, temp workspace and
//! fixture roots, and a seeded catalog.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use codeforge::config::{database, Config};
use codeforge::models::{Chapter, ExerciseData, Language, TestCaseData};
use codeforge::services::AppState;

pub struct TestEnv {
    pub state: Arc<AppState>,
    // Held for the lifetime of the test; dropping removes the trees.
    #[allow(dead_code)]
    pub root: TempDir,
}

pub async fn test_env() -> TestEnv {
    let root = TempDir::new().expect("temp root");
    let config = Config {
        database_url: format!("sqlite://{}", root.path().join("test.db").display()),
        port: 0,
        jwt_secret: "test-secret".into(),
        execution_image_tag: "latest".into(),
        per_test_timeout: Duration::from_secs(5),
        max_parallel_executions: 2,
        container_memory_cap: "256m".into(),
        container_pids_cap: 128,
        temp_root: root.path().join("workspaces"),
        fixtures_root: root.path().join("fixtures"),
        admin_emails: vec!["admin@example.com".into()],
    };

    let pool = database::create_pool(&config.database_url)
        .await
        .expect("pool");
    database::init_db(&pool).await.expect("schema");

    let state = Arc::new(AppState::new(pool, config).await.expect("state"));
    TestEnv { state, root }
}

pub fn shell_language() -> Language {
    Language {
        id: "shell".into(),
        name: "Shell".into(),
        extension: "sh".into(),
        interpreter: "bash".into(),
        image: "codeforge-exec".into(),
        order_index: 0,
        enabled: true,
    }
}

pub fn chapter(id: &str, language_id: &str, order: i64) -> Chapter {
    Chapter {
        id: id.into(),
        language_id: language_id.into(),
        name: format!("Chapter {id}"),
        order_index: order,
    }
}

pub fn echo_case(args: &[&str], expected_stdout: &str) -> TestCaseData {
    TestCaseData {
        args: args.iter().map(|s| s.to_string()).collect(),
        stdin_lines: vec![],
        expected_stdout: expected_stdout.into(),
        expected_stderr: None,
        expected_exit_code: 0,
        fixtures: vec![],
        output_files: Default::default(),
    }
}

pub fn exercise(id: &str, chapter_id: &str, cases: Vec<TestCaseData>) -> ExerciseData {
    ExerciseData {
        id: id.into(),
        chapter_id: chapter_id.into(),
        title: format!("Exercise {id}"),
        description: "Write a script.".into(),
        solution: "echo solution".into(),
        test_cases: cases,
    }
}

/// Seed one language with one chapter and `n` single-case exercises named
/// `<prefix>-1..n`. Returns the exercise ids.
pub async fn seed_exercises(
    state: &AppState,
    chapter_id: &str,
    prefix: &str,
    n: usize,
) -> Vec<String> {
    let mut ids = Vec::new();
    for i in 1..=n {
        let id = format!("{prefix}-{i}");
        let data = exercise(&id, chapter_id, vec![echo_case(&[], "ok\n")]);
        state.catalog.create_exercise(&data).await.expect("exercise");
        ids.push(id);
    }
    ids
}

pub async fn seed_basic_catalog(state: &AppState) {
    state
        .catalog
        .create_language(&shell_language())
        .await
        .expect("language");
    state
        .catalog
        .create_chapter(&chapter("basics", "shell", 0))
        .await
        .expect("chapter");
}
