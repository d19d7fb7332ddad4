use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub async fn create_pool(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create the schema and seed the achievement catalog. Idempotent.
pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement).execute(pool).await?;
        }
    }

    crate::repository::achievement_repo::seed_defaults(pool).await?;

    Ok(())
}

// user_progress.exercise_id intentionally carries no foreign key: progress
// survives exercise deletion, and catalog queries skip dangling rows.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS languages (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    extension   TEXT NOT NULL,
    interpreter TEXT NOT NULL,
    image       TEXT NOT NULL,
    order_index INTEGER NOT NULL DEFAULT 0,
    enabled     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS chapters (
    id          TEXT PRIMARY KEY,
    language_id TEXT NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    order_index INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS exercises (
    id          TEXT PRIMARY KEY,
    chapter_id  TEXT NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    solution    TEXT NOT NULL DEFAULT '',
    order_index INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS test_cases (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    exercise_id        TEXT NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
    order_index        INTEGER NOT NULL,
    args               TEXT NOT NULL DEFAULT '[]',
    stdin_lines        TEXT NOT NULL DEFAULT '[]',
    expected_stdout    TEXT NOT NULL DEFAULT '',
    expected_stderr    TEXT,
    expected_exit_code INTEGER NOT NULL DEFAULT 0,
    fixtures           TEXT NOT NULL DEFAULT '[]',
    output_files       TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS fixtures (
    path        TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    size        INTEGER NOT NULL DEFAULT 0,
    permissions TEXT NOT NULL DEFAULT 'rw-r--r--',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY,
    email      TEXT NOT NULL,
    name       TEXT NOT NULL,
    is_admin   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_login TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_progress (
    user_id              TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    exercise_id          TEXT NOT NULL,
    completed            INTEGER NOT NULL DEFAULT 0,
    last_submission      TEXT,
    first_seen           TEXT NOT NULL,
    completed_at         TEXT,
    completed_on_attempt INTEGER,
    attempts             INTEGER NOT NULL DEFAULT 0,
    successful_attempts  INTEGER NOT NULL DEFAULT 0,
    failed_attempts      INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, exercise_id)
);

CREATE TABLE IF NOT EXISTS achievements (
    id          TEXT PRIMARY KEY,
    category    TEXT NOT NULL,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    icon        TEXT NOT NULL,
    points      INTEGER NOT NULL DEFAULT 0,
    kind        TEXT NOT NULL,
    threshold   INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS user_achievements (
    user_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    achievement_id TEXT NOT NULL REFERENCES achievements(id) ON DELETE CASCADE,
    earned_at      TEXT NOT NULL,
    progress       INTEGER NOT NULL DEFAULT 100,
    PRIMARY KEY (user_id, achievement_id)
);

CREATE INDEX IF NOT EXISTS idx_chapters_language ON chapters(language_id, order_index);
CREATE INDEX IF NOT EXISTS idx_exercises_chapter ON exercises(chapter_id, order_index);
CREATE INDEX IF NOT EXISTS idx_test_cases_exercise ON test_cases(exercise_id, order_index);
CREATE INDEX IF NOT EXISTS idx_progress_user ON user_progress(user_id)
"#;
