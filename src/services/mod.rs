pub mod comparator;
pub mod fixtures;
pub mod grader;
pub mod progress;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::repository::{
    AchievementRepository, CatalogRepository, ProgressRepository, UserRepository,
};
use crate::sandbox::SandboxRunner;

pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub catalog: CatalogRepository,
    pub users: UserRepository,
    pub achievements: AchievementRepository,
    pub fixtures: Arc<fixtures::FixtureStore>,
    pub runner: Arc<SandboxRunner>,
    pub grader: grader::GraderService,
    pub progress: progress::ProgressService,
}

impl AppState {
    pub async fn new(db: SqlitePool, config: Config) -> anyhow::Result<Self> {
        let catalog = CatalogRepository::new(db.clone());
        let users = UserRepository::new(db.clone());
        let achievements = AchievementRepository::new(db.clone());
        let progress_repo = ProgressRepository::new(db.clone());

        let fixtures = Arc::new(
            fixtures::FixtureStore::new(config.fixtures_root.clone(), db.clone()).await?,
        );
        let runner = Arc::new(SandboxRunner::new(
            config.clone(),
            catalog.clone(),
            fixtures.clone(),
        ));
        let grader = grader::GraderService::new(runner.clone());
        let progress = progress::ProgressService::new(
            progress_repo,
            achievements.clone(),
            catalog.clone(),
        );

        Ok(Self {
            db,
            config,
            catalog,
            users,
            achievements,
            fixtures,
            runner,
            grader,
            progress,
        })
    }
}
