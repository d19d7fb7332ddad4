//! Progress counters and achievement evaluation.
//!
//! Every grade records an attempt, then walks the achievement catalog and
//! awards whatever predicates now hold. Awards are idempotent; concurrent
//! upserts for the same (user, exercise) serialize on a keyed mutex so no
//! counter increment is lost.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{Achievement, AchievementKind, Statistics, UserProgress};
use crate::repository::progress_repo::AttemptOutcome;
use crate::repository::{AchievementRepository, CatalogRepository, ProgressRepository};

#[derive(Clone)]
pub struct ProgressService {
    progress: ProgressRepository,
    achievements: AchievementRepository,
    catalog: CatalogRepository,
    upsert_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ProgressService {
    pub fn new(
        progress: ProgressRepository,
        achievements: AchievementRepository,
        catalog: CatalogRepository,
    ) -> Self {
        Self {
            progress,
            achievements,
            catalog,
            upsert_locks: Arc::new(DashMap::new()),
        }
    }

    /// Record one graded attempt and return any newly earned achievements.
    pub async fn record_attempt(
        &self,
        user_id: &str,
        exercise_id: &str,
        all_passed: bool,
        submission: &str,
    ) -> Result<Vec<Achievement>> {
        let lock = self
            .upsert_locks
            .entry(format!("{user_id}/{exercise_id}"))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let outcome = self
            .progress
            .record_attempt(user_id, exercise_id, all_passed, submission)
            .await?;

        self.evaluate_achievements(user_id, exercise_id, &outcome)
            .await
    }

    async fn evaluate_achievements(
        &self,
        user_id: &str,
        exercise_id: &str,
        outcome: &AttemptOutcome,
    ) -> Result<Vec<Achievement>> {
        let catalog = self.achievements.list().await?;
        let earned: HashSet<String> = self
            .achievements
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|a| a.achievement_id)
            .collect();

        let completed_total = self.progress.count_completed(user_id).await?;
        let first_try_total = self.progress.count_first_try(user_id).await?;
        let last_hour = self
            .progress
            .completions_since(user_id, Utc::now() - Duration::hours(1))
            .await?;

        let completion_times = self.progress.completion_times(user_id).await?;
        let now = Local::now();
        let local_dates: BTreeSet<NaiveDate> = completion_times
            .iter()
            .map(|t| t.with_timezone(&Local).date_naive())
            .collect();
        let today_count = completion_times
            .iter()
            .filter(|t| t.with_timezone(&Local).date_naive() == now.date_naive())
            .count() as i64;
        let streak = trailing_streak(&local_dates, now.date_naive());

        let mut newly_earned = Vec::new();
        for achievement in catalog {
            if earned.contains(&achievement.id) {
                continue;
            }
            let satisfied = match achievement.kind {
                AchievementKind::TotalCompleted => completed_total >= achievement.threshold,
                AchievementKind::FirstTry => first_try_total >= achievement.threshold,
                AchievementKind::Persistence => {
                    outcome.newly_completed
                        && outcome.progress.completed_on_attempt.unwrap_or(0)
                            >= achievement.threshold
                }
                AchievementKind::CompletedInHour => last_hour >= achievement.threshold,
                AchievementKind::CompletedInDay => today_count >= achievement.threshold,
                AchievementKind::NightWindow => {
                    outcome.newly_completed && local_hour_in(&now, 0, 5)
                }
                AchievementKind::MorningWindow => {
                    outcome.newly_completed && local_hour_in(&now, 5, 8)
                }
                AchievementKind::DailyStreak => streak >= achievement.threshold,
                AchievementKind::ChapterComplete => {
                    outcome.newly_completed
                        && self.chapter_completed(user_id, exercise_id).await?
                }
                AchievementKind::LanguageComplete => {
                    outcome.newly_completed
                        && self.language_completed(user_id, exercise_id).await?
                }
            };

            if satisfied && self.achievements.award(user_id, &achievement.id).await? {
                tracing::info!(user = user_id, achievement = %achievement.id, "achievement earned");
                newly_earned.push(achievement);
            }
        }

        Ok(newly_earned)
    }

    async fn chapter_completed(&self, user_id: &str, exercise_id: &str) -> Result<bool> {
        let Some(exercise) = self.catalog.get_exercise(exercise_id).await? else {
            return Ok(false);
        };
        let completed: HashSet<String> = self
            .progress
            .completed_exercise_ids(user_id)
            .await?
            .into_iter()
            .collect();
        self.all_chapter_exercises_in(&exercise.chapter_id, &completed)
            .await
    }

    async fn language_completed(&self, user_id: &str, exercise_id: &str) -> Result<bool> {
        let Some(exercise) = self.catalog.get_exercise(exercise_id).await? else {
            return Ok(false);
        };
        let Some(chapter) = self.catalog.get_chapter(&exercise.chapter_id).await? else {
            return Ok(false);
        };
        let completed: HashSet<String> = self
            .progress
            .completed_exercise_ids(user_id)
            .await?
            .into_iter()
            .collect();

        let chapter_ids = self
            .catalog
            .chapter_ids_in_language(&chapter.language_id)
            .await?;
        if chapter_ids.is_empty() {
            return Ok(false);
        }
        for chapter_id in chapter_ids {
            if !self
                .all_chapter_exercises_in(&chapter_id, &completed)
                .await?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn all_chapter_exercises_in(
        &self,
        chapter_id: &str,
        completed: &HashSet<String>,
    ) -> Result<bool> {
        let ids = self.catalog.exercise_ids_in_chapter(chapter_id).await?;
        Ok(!ids.is_empty() && ids.iter().all(|id| completed.contains(id)))
    }

    pub async fn statistics(&self, user_id: &str) -> Result<Statistics> {
        let mut stats = self.progress.statistics(user_id).await?;
        stats.points = self.achievements.total_points(user_id).await?;
        Ok(stats)
    }

    pub async fn exercise_progress(
        &self,
        user_id: &str,
        exercise_id: &str,
    ) -> Result<Option<UserProgress>> {
        self.progress.get(user_id, exercise_id).await
    }

    pub async fn completed_exercise_ids_for(&self, user_id: &str) -> Result<Vec<String>> {
        self.progress.completed_exercise_ids(user_id).await
    }
}

fn local_hour_in(now: &DateTime<Local>, from: u32, to: u32) -> bool {
    use chrono::Timelike;
    let hour = now.hour();
    hour >= from && hour < to
}

/// Longest run of consecutive dates ending today or yesterday.
fn trailing_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> i64 {
    let yesterday = today.pred_opt().unwrap_or(today);
    let mut cursor = if dates.contains(&today) {
        today
    } else if dates.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 1;
    while let Some(prev) = cursor.pred_opt() {
        if !dates.contains(&prev) {
            break;
        }
        streak += 1;
        cursor = prev;
    }
    streak
}
