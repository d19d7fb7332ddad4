use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-(user, exercise) grading history.
///
/// Invariants: `successful_attempts + failed_attempts = attempts`; a
/// completed row has `completed_at` set and at least one success.
/// `completed_on_attempt` records the attempt counter at the first
/// transition to completed and never changes afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProgress {
    pub user_id: String,
    pub exercise_id: String,
    pub completed: bool,
    pub last_submission: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_on_attempt: Option<i64>,
    pub attempts: i64,
    pub successful_attempts: i64,
    pub failed_attempts: i64,
}

/// Aggregate counters returned alongside grade responses and on the
/// statistics endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub completed_exercises: i64,
    pub total_attempts: i64,
    pub successful_attempts: i64,
    pub failed_attempts: i64,
    pub points: i64,
}
