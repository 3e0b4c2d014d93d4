//! Github API payloads and conversion to Repo struct
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::utils::Repo;

/// Github Repo
#[derive(Deserialize, Debug, Clone)]
pub struct RepoGithub {
    /// Repository name
    pub name: String,

    /// Repository description
    pub description: Option<String>,

    /// Repository private status
    pub private: bool,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Repository size in KB
    #[serde(default)]
    pub size: u64,
}

impl From<RepoGithub> for Repo {
    fn from(repo: RepoGithub) -> Self {
        Repo {
            name: repo.name,
            created_at: repo.created_at,
            private: repo.private,
            description: repo.description.filter(|d| !d.is_empty()),
            disk_usage: repo.size,
            uses_lfs: false,
        }
    }
}

/// Branch, as listed or fetched
#[derive(Deserialize, Debug, Clone)]
pub struct BranchGithub {
    /// Branch name
    pub name: String,

    /// Head commit
    pub commit: CommitGithub,
}

/// Commit reference
#[derive(Deserialize, Debug, Clone)]
pub struct CommitGithub {
    /// Commit hash
    pub sha: String,
}

/// File returned by the contents API
#[derive(Deserialize, Debug, Clone)]
pub struct ContentGithub {
    /// Encoded content
    #[serde(default)]
    pub content: String,

    /// Encoding of `content`, `base64` for files
    #[serde(default)]
    pub encoding: String,
}
