//! Hosting platform abstraction
use std::{future::Future, pin::Pin};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{errors::OrgMoverError, utils::Repo};

/// Future returned by every [`Platform`] operation
pub type PlatformFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, OrgMoverError>> + Send + 'a>>;

/// Repository to create on the destination organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoCreation {
    /// Name of the new repository
    pub name: String,

    /// Whether the new repository is private
    pub private: bool,

    /// Description of the new repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Operations org-mover needs from a hosting service
pub trait Platform: Sync + Send {
    /// Verify the client tooling is present and authenticated
    fn check_prerequisites(&self) -> PlatformFuture<'_, ()>;

    /// Verify the organization exists and is reachable
    fn check_access<'a>(&'a self, org: &'a str) -> PlatformFuture<'a, ()>;

    /// List up to 1000 repositories of the organization
    fn get_all_repos<'a>(&'a self, org: &'a str) -> PlatformFuture<'a, Vec<Repo>>;

    /// Content of a file at the default branch of a repository
    fn get_file_content<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        path: &'a str,
    ) -> PlatformFuture<'a, String>;

    /// Names of every branch of a repository
    fn list_branches<'a>(&'a self, org: &'a str, repo: &'a str)
        -> PlatformFuture<'a, Vec<String>>;

    /// Commit hash at the head of a branch
    fn get_branch_head<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> PlatformFuture<'a, String>;

    /// Create an empty repository in the organization
    fn create_repo<'a>(&'a self, org: &'a str, repo: &'a RepoCreation)
        -> PlatformFuture<'a, ()>;

    /// URL used by git to clone or push the repository
    fn clone_url(&self, org: &str, repo: &str) -> String;

    /// Kind of backend
    fn get_type(&self) -> PlatformType;
}

/// Available hosting backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    /// GitHub through the `gh` command line client
    #[default]
    Gh,

    /// GitHub through its REST API, with a personal access token
    Api,
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformType::Gh => write!(f, "gh"),
            PlatformType::Api => write!(f, "api"),
        }
    }
}
