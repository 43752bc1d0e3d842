use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::HOME;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "StoredTask")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub completed: bool,
}

impl Task {
    /// Builds an open task with a fresh id. The title is stored trimmed; callers validate it.
    pub fn new(title: &str, category: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.trim().to_string(),
            category: category.to_string(),
            completed: false,
        }
    }

    pub fn short_id(&self) -> String {
        let mut text = self.id.simple().to_string();
        text.truncate(8);
        text
    }
}

/// On-disk task element. Older files hold bare strings instead of task objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredTask {
    Legacy(String),
    Record {
        #[serde(default)]
        id: Option<Uuid>,
        title: String,
        #[serde(default = "default_category")]
        category: String,
        #[serde(default)]
        completed: bool,
    },
}

fn default_category() -> String {
    HOME.to_string()
}

impl From<StoredTask> for Task {
    fn from(value: StoredTask) -> Self {
        match value {
            StoredTask::Legacy(title) => Self {
                id: Uuid::new_v4(),
                title,
                category: default_category(),
                completed: false,
            },
            StoredTask::Record {
                id,
                title,
                category,
                completed,
            } => Self {
                id: id.unwrap_or_else(Uuid::new_v4),
                title,
                category,
                completed,
            },
        }
    }
}
