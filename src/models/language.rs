use serde::{Deserialize, Serialize};

/// An execution target: maps a stable identifier to the interpreter and
/// container image used to run submissions.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Language {
    pub id: String,
    pub name: String,
    pub extension: String,
    pub interpreter: String,
    pub image: String,
    pub order_index: i64,
    pub enabled: bool,
}

impl Language {
    /// Image reference used for container launches. A recorded image with an
    /// explicit tag wins; otherwise the configured default tag is appended.
    pub fn image_ref(&self, default_tag: &str) -> String {
        if self.image.contains(':') {
            self.image.clone()
        } else {
            format!("{}:{}", self.image, default_tag)
        }
    }

    /// File name the submission is written to inside the workspace.
    pub fn script_file(&self) -> String {
        format!("script.{}", self.extension)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chapter {
    pub id: String,
    pub language_id: String,
    pub name: String,
    pub order_index: i64,
}
