use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A learner or admin. Rows are auto-created on first authenticated request;
/// the identifier is the stable subject from the identity provider.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}
