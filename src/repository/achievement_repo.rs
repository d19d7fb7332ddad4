use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{Achievement, AchievementKind, UserAchievement};

#[derive(Clone)]
pub struct AchievementRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct AchievementRow {
    id: String,
    category: String,
    name: String,
    description: String,
    icon: String,
    points: i64,
    kind: String,
    threshold: i64,
}

impl AchievementRow {
    fn into_achievement(self) -> Option<Achievement> {
        let kind = AchievementKind::from_str(&self.kind)?;
        Some(Achievement {
            id: self.id,
            category: self.category,
            name: self.name,
            description: self.description,
            icon: self.icon,
            points: self.points,
            kind,
            threshold: self.threshold,
        })
    }
}

impl AchievementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Achievement>> {
        let rows = sqlx::query_as::<_, AchievementRow>(
            "SELECT * FROM achievements ORDER BY category, points, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(AchievementRow::into_achievement)
            .collect())
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserAchievement>> {
        let rows = sqlx::query_as::<_, UserAchievement>(
            "SELECT * FROM user_achievements WHERE user_id = ? ORDER BY earned_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Idempotent award: returns true only for the insert that won.
    pub async fn award(&self, user_id: &str, achievement_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_achievements \
             (user_id, achievement_id, earned_at, progress) VALUES (?, ?, ?, 100)",
        )
        .bind(user_id)
        .bind(achievement_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn total_points(&self, user_id: &str) -> Result<i64> {
        let points = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(a.points), 0) FROM user_achievements ua \
             JOIN achievements a ON a.id = ua.achievement_id WHERE ua.user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(points)
    }
}

/// Seed the built-in achievement catalog. Existing rows are left untouched so
/// admins can re-point thresholds without a reset on restart.
pub async fn seed_defaults(pool: &SqlitePool) -> Result<()> {
    const DEFAULTS: &[(&str, &str, &str, &str, &str, i64, AchievementKind, i64)] = &[
        (
            "first-steps",
            "progress",
            "First Steps",
            "Complete your first exercise",
            "\u{1F331}",
            10,
            AchievementKind::TotalCompleted,
            1,
        ),
        (
            "committed-learner",
            "progress",
            "Committed Learner",
            "Complete 10 exercises",
            "\u{1F4DA}",
            25,
            AchievementKind::TotalCompleted,
            10,
        ),
        (
            "half-century",
            "progress",
            "Half Century",
            "Complete 50 exercises",
            "\u{1F3C6}",
            100,
            AchievementKind::TotalCompleted,
            50,
        ),
        (
            "bullseye",
            "precision",
            "Bullseye",
            "Complete an exercise on the first attempt",
            "\u{1F3AF}",
            15,
            AchievementKind::FirstTry,
            1,
        ),
        (
            "sharpshooter",
            "precision",
            "Sharpshooter",
            "Complete 10 exercises on the first attempt",
            "\u{1F3F9}",
            50,
            AchievementKind::FirstTry,
            10,
        ),
        (
            "persistence-pays",
            "grit",
            "Persistence Pays",
            "Crack an exercise after five or more attempts",
            "\u{1F528}",
            20,
            AchievementKind::Persistence,
            5,
        ),
        (
            "hot-streak",
            "speed",
            "Hot Streak",
            "Complete 5 exercises within one hour",
            "\u{26A1}",
            30,
            AchievementKind::CompletedInHour,
            5,
        ),
        (
            "daily-grind",
            "speed",
            "Daily Grind",
            "Complete 10 exercises in a single day",
            "\u{1F4C5}",
            40,
            AchievementKind::CompletedInDay,
            10,
        ),
        (
            "night-owl",
            "clock",
            "Night Owl",
            "Complete an exercise between midnight and 5 AM",
            "\u{1F989}",
            15,
            AchievementKind::NightWindow,
            1,
        ),
        (
            "early-bird",
            "clock",
            "Early Bird",
            "Complete an exercise between 5 and 8 AM",
            "\u{1F426}",
            15,
            AchievementKind::MorningWindow,
            1,
        ),
        (
            "on-a-roll",
            "streak",
            "On a Roll",
            "Complete exercises on 3 consecutive days",
            "\u{1F525}",
            20,
            AchievementKind::DailyStreak,
            3,
        ),
        (
            "week-warrior",
            "streak",
            "Week Warrior",
            "Complete exercises on 7 consecutive days",
            "\u{1F5E1}",
            50,
            AchievementKind::DailyStreak,
            7,
        ),
        (
            "unstoppable",
            "streak",
            "Unstoppable",
            "Complete exercises on 30 consecutive days",
            "\u{1F680}",
            150,
            AchievementKind::DailyStreak,
            30,
        ),
        (
            "chapter-champion",
            "mastery",
            "Chapter Champion",
            "Complete every exercise in a chapter",
            "\u{1F396}",
            50,
            AchievementKind::ChapterComplete,
            1,
        ),
        (
            "language-master",
            "mastery",
            "Language Master",
            "Complete every chapter of a language",
            "\u{1F451}",
            200,
            AchievementKind::LanguageComplete,
            1,
        ),
    ];

    for (id, category, name, description, icon, points, kind, threshold) in DEFAULTS {
        sqlx::query(
            "INSERT OR IGNORE INTO achievements \
             (id, category, name, description, icon, points, kind, threshold) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(*id)
        .bind(*category)
        .bind(*name)
        .bind(*description)
        .bind(*icon)
        .bind(*points)
        .bind(kind.as_str())
        .bind(*threshold)
        .execute(pool)
        .await?;
    }

    Ok(())
}
