pub mod achievement;
pub mod exercise;
pub mod fixture;
pub mod language;
pub mod progress;
pub mod user;

pub use achievement::{Achievement, AchievementKind, UserAchievement};
pub use exercise::{Exercise, ExerciseData, ExerciseWithTests, TestCase, TestCaseData};
pub use fixture::{Fixture, FixtureKind};
pub use language::{Chapter, Language};
pub use progress::{Statistics, UserProgress};
pub use user::User;
