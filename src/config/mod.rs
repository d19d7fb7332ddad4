pub mod database;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub execution_image_tag: String,
    pub per_test_timeout: Duration,
    pub max_parallel_executions: usize,
    pub container_memory_cap: String,
    pub container_pids_cap: u32,
    pub temp_root: PathBuf,
    pub fixtures_root: PathBuf,
    pub admin_emails: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://codeforge.db".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("invalid PORT value")?,

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,

            execution_image_tag: env::var("EXECUTION_IMAGE_TAG")
                .unwrap_or_else(|_| "latest".to_string()),

            per_test_timeout: Duration::from_millis(
                env::var("PER_TEST_TIMEOUT_MS")
                    .unwrap_or_else(|_| "30000".to_string())
                    .parse()
                    .context("invalid PER_TEST_TIMEOUT_MS value")?,
            ),

            max_parallel_executions: env::var("MAX_PARALLEL_EXECUTIONS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .context("invalid MAX_PARALLEL_EXECUTIONS value")?,

            container_memory_cap: env::var("CONTAINER_MEMORY_CAP")
                .unwrap_or_else(|_| "256m".to_string()),

            container_pids_cap: env::var("CONTAINER_PIDS_CAP")
                .unwrap_or_else(|_| "128".to_string())
                .parse()
                .context("invalid CONTAINER_PIDS_CAP value")?,

            temp_root: env::var("TEMP_ROOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("codeforge")),

            fixtures_root: env::var("FIXTURES_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./fixtures")),

            admin_emails: env::var("ADMIN_EMAILS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|a| a == &email.to_lowercase())
    }
}
