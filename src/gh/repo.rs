//! Repository as listed by `gh repo list --json`
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::utils::Repo;

/// `gh repo list` entry
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GhRepo {
    /// Repository name
    pub name: String,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Repository private status
    pub is_private: bool,

    /// Repository description, empty when unset
    #[serde(default)]
    pub description: Option<String>,

    /// Repository size in KB
    #[serde(default)]
    pub disk_usage: Option<u64>,
}

impl From<GhRepo> for Repo {
    fn from(repo: GhRepo) -> Self {
        Repo {
            name: repo.name,
            created_at: repo.created_at,
            private: repo.is_private,
            description: repo.description.filter(|d| !d.is_empty()),
            disk_usage: repo.disk_usage.unwrap_or_default(),
            uses_lfs: false,
        }
    }
}
