use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

/// Admin listing row: account plus progress aggregates.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub completed_exercises: i64,
    pub total_attempts: i64,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Auto-create on first authentication; refresh profile and last-login on
    /// every subsequent one. The admin flag is never touched here.
    pub async fn upsert_login(&self, id: &str, email: &str, name: &str) -> Result<User> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, email, name, is_admin, created_at, last_login) \
             VALUES (?, ?, ?, 0, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name, \
             last_login = excluded.last_login",
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| Error::Internal("user vanished after upsert".into()))
    }

    pub async fn list(&self) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.email, u.name, u.is_admin, \
             COALESCE(SUM(p.completed), 0) AS completed_exercises, \
             COALESCE(SUM(p.attempts), 0) AS total_attempts \
             FROM users u LEFT JOIN user_progress p ON p.user_id = u.id \
             GROUP BY u.id ORDER BY u.created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn set_admin(&self, id: &str, is_admin: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE id = ?")
            .bind(is_admin)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("user {id}")));
        }
        Ok(())
    }

    /// Cascades to progress and earned achievements.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("user {id}")));
        }
        Ok(())
    }
}
