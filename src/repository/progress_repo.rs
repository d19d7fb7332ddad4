//! UserProgress persistence.
//!
//! `record_attempt` runs inside a transaction; the counters obey
//! `successful + failed = attempts` and `completed` never flips back.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{Statistics, UserProgress};

#[derive(Clone)]
pub struct ProgressRepository {
    pool: SqlitePool,
}

/// Outcome of one recorded attempt.
pub struct AttemptOutcome {
    pub progress: UserProgress,
    /// True when this attempt flipped `completed` from false to true.
    pub newly_completed: bool,
}

impl ProgressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str, exercise_id: &str) -> Result<Option<UserProgress>> {
        let progress = sqlx::query_as::<_, UserProgress>(
            "SELECT * FROM user_progress WHERE user_id = ? AND exercise_id = ?",
        )
        .bind(user_id)
        .bind(exercise_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(progress)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserProgress>> {
        let rows = sqlx::query_as::<_, UserProgress>(
            "SELECT * FROM user_progress WHERE user_id = ? ORDER BY first_seen",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn record_attempt(
        &self,
        user_id: &str,
        exercise_id: &str,
        passed: bool,
        submission: &str,
    ) -> Result<AttemptOutcome> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, UserProgress>(
            "SELECT * FROM user_progress WHERE user_id = ? AND exercise_id = ?",
        )
        .bind(user_id)
        .bind(exercise_id)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_none() {
            sqlx::query(
                "INSERT INTO user_progress (user_id, exercise_id, first_seen) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(exercise_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let was_completed = existing.as_ref().map(|p| p.completed).unwrap_or(false);
        let attempts = existing.as_ref().map(|p| p.attempts).unwrap_or(0) + 1;
        let newly_completed = passed && !was_completed;

        if newly_completed {
            sqlx::query(
                "UPDATE user_progress SET attempts = attempts + 1, \
                 successful_attempts = successful_attempts + 1, completed = 1, \
                 completed_at = ?, completed_on_attempt = ?, last_submission = ? \
                 WHERE user_id = ? AND exercise_id = ?",
            )
            .bind(now)
            .bind(attempts)
            .bind(submission)
            .bind(user_id)
            .bind(exercise_id)
            .execute(&mut *tx)
            .await?;
        } else if passed {
            sqlx::query(
                "UPDATE user_progress SET attempts = attempts + 1, \
                 successful_attempts = successful_attempts + 1, last_submission = ? \
                 WHERE user_id = ? AND exercise_id = ?",
            )
            .bind(submission)
            .bind(user_id)
            .bind(exercise_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                "UPDATE user_progress SET attempts = attempts + 1, \
                 failed_attempts = failed_attempts + 1, last_submission = ? \
                 WHERE user_id = ? AND exercise_id = ?",
            )
            .bind(submission)
            .bind(user_id)
            .bind(exercise_id)
            .execute(&mut *tx)
            .await?;
        }

        let progress = sqlx::query_as::<_, UserProgress>(
            "SELECT * FROM user_progress WHERE user_id = ? AND exercise_id = ?",
        )
        .bind(user_id)
        .bind(exercise_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AttemptOutcome {
            progress,
            newly_completed,
        })
    }

    /// Aggregate counters; `points` is filled in by the progress service.
    pub async fn statistics(&self, user_id: &str) -> Result<Statistics> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(completed), 0), COALESCE(SUM(attempts), 0), \
             COALESCE(SUM(successful_attempts), 0), COALESCE(SUM(failed_attempts), 0) \
             FROM user_progress WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Statistics {
            completed_exercises: row.0,
            total_attempts: row.1,
            successful_attempts: row.2,
            failed_attempts: row.3,
            points: 0,
        })
    }

    pub async fn count_completed(&self, user_id: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_progress WHERE user_id = ? AND completed = 1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_first_try(&self, user_id: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_progress \
             WHERE user_id = ? AND completed_on_attempt = 1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn completions_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_progress \
             WHERE user_id = ? AND completed = 1 AND completed_at >= ?",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// All completion timestamps for local-time window and streak predicates.
    pub async fn completion_times(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        let times = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT completed_at FROM user_progress \
             WHERE user_id = ? AND completed_at IS NOT NULL ORDER BY completed_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(times)
    }

    pub async fn completed_exercise_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT exercise_id FROM user_progress WHERE user_id = ? AND completed = 1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
