use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Requirement predicate families. Each achievement row pairs a kind with a
/// numeric threshold; the progress engine evaluates them after every grade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    /// Total exercises completed reaches the threshold.
    TotalCompleted,
    /// Exercises completed on the very first attempt.
    FirstTry,
    /// A single exercise needed at least `threshold` attempts before its
    /// first success.
    Persistence,
    /// Exercises completed within the last rolling hour.
    CompletedInHour,
    /// Exercises completed during the current local calendar day.
    CompletedInDay,
    /// A completion landed between 00:00 and 05:00 local time.
    NightWindow,
    /// A completion landed between 05:00 and 08:00 local time.
    MorningWindow,
    /// Trailing run of consecutive local days with a completion.
    DailyStreak,
    /// Every exercise of the completed exercise's chapter is done.
    ChapterComplete,
    /// Every chapter of the enclosing language is done.
    LanguageComplete,
}

impl AchievementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementKind::TotalCompleted => "total_completed",
            AchievementKind::FirstTry => "first_try",
            AchievementKind::Persistence => "persistence",
            AchievementKind::CompletedInHour => "completed_in_hour",
            AchievementKind::CompletedInDay => "completed_in_day",
            AchievementKind::NightWindow => "night_window",
            AchievementKind::MorningWindow => "morning_window",
            AchievementKind::DailyStreak => "daily_streak",
            AchievementKind::ChapterComplete => "chapter_complete",
            AchievementKind::LanguageComplete => "language_complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "total_completed" => Some(AchievementKind::TotalCompleted),
            "first_try" => Some(AchievementKind::FirstTry),
            "persistence" => Some(AchievementKind::Persistence),
            "completed_in_hour" => Some(AchievementKind::CompletedInHour),
            "completed_in_day" => Some(AchievementKind::CompletedInDay),
            "night_window" => Some(AchievementKind::NightWindow),
            "morning_window" => Some(AchievementKind::MorningWindow),
            "daily_streak" => Some(AchievementKind::DailyStreak),
            "chapter_complete" => Some(AchievementKind::ChapterComplete),
            "language_complete" => Some(AchievementKind::LanguageComplete),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub category: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub points: i64,
    pub kind: AchievementKind,
    pub threshold: i64,
}

/// Earned achievements are monotone: once present, never revoked.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAchievement {
    pub user_id: String,
    pub achievement_id: String,
    pub earned_at: DateTime<Utc>,
    pub progress: i64,
}
