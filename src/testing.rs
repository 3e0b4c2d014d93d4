//! In-memory platform and transport used by the tests
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use crate::errors::{OrgMoverError, OrgMoverErrorKind};
use crate::git::{GitTransport, TransportFuture};
use crate::platform::{Platform, PlatformFuture, PlatformType, RepoCreation};
use crate::utils::Repo;

/// Build a public repository created at `created_at` (RFC 3339)
pub(crate) fn repo(name: &str, created_at: &str) -> Repo {
    Repo {
        name: name.to_string(),
        created_at: created_at.parse().unwrap(),
        private: false,
        description: None,
        disk_usage: 0,
        uses_lfs: false,
    }
}

/// Lowercase `org/repo` key, names being case-insensitive
fn key(org: &str, repo: &str) -> String {
    format!("{org}/{repo}").to_lowercase()
}

/// Platform answering from memory
#[derive(Default)]
pub(crate) struct MockPlatform {
    repos: HashMap<String, Vec<Repo>>,
    files: HashMap<(String, String), String>,
    branches: HashMap<String, Vec<(String, String)>>,
    failing_listings: HashSet<String>,
    failing_branches: HashSet<String>,
    failing_creations: HashSet<String>,
    create_attempts: Mutex<usize>,
    created: Mutex<Vec<(String, RepoCreation)>>,
}

impl MockPlatform {
    pub(crate) fn with_repo(mut self, org: &str, repo: Repo) -> Self {
        self.repos.entry(org.to_string()).or_default().push(repo);
        self
    }

    pub(crate) fn with_file(mut self, org: &str, repo: &str, path: &str, content: &str) -> Self {
        self.files
            .insert((key(org, repo), path.to_string()), content.to_string());
        self
    }

    pub(crate) fn with_branch(mut self, org: &str, repo: &str, branch: &str, sha: &str) -> Self {
        self.branches
            .entry(key(org, repo))
            .or_default()
            .push((branch.to_string(), sha.to_string()));
        self
    }

    pub(crate) fn failing_listing(mut self, org: &str) -> Self {
        self.failing_listings.insert(org.to_string());
        self
    }

    pub(crate) fn failing_branches(mut self, org: &str, repo: &str) -> Self {
        self.failing_branches.insert(key(org, repo));
        self
    }

    pub(crate) fn failing_create(mut self, name: &str) -> Self {
        self.failing_creations.insert(name.to_string());
        self
    }

    /// Successful creations, in order
    pub(crate) fn created(&self) -> Vec<(String, RepoCreation)> {
        self.created.lock().unwrap().clone()
    }

    /// Creation calls, failed ones included
    pub(crate) fn create_attempts(&self) -> usize {
        *self.create_attempts.lock().unwrap()
    }
}

impl Platform for MockPlatform {
    fn check_prerequisites(&self) -> PlatformFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn check_access<'a>(&'a self, _org: &'a str) -> PlatformFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn get_all_repos<'a>(&'a self, org: &'a str) -> PlatformFuture<'a, Vec<Repo>> {
        Box::pin(async move {
            if self.failing_listings.contains(org) {
                return Err(OrgMoverError::new(OrgMoverErrorKind::GetAllRepos));
            }
            Ok(self.repos.get(org).cloned().unwrap_or_default())
        })
    }

    fn get_file_content<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        path: &'a str,
    ) -> PlatformFuture<'a, String> {
        Box::pin(async move {
            self.files
                .get(&(key(org, repo), path.to_string()))
                .cloned()
                .ok_or_else(|| OrgMoverError::new(OrgMoverErrorKind::GetFile))
        })
    }

    fn list_branches<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
    ) -> PlatformFuture<'a, Vec<String>> {
        Box::pin(async move {
            let key = key(org, repo);
            if self.failing_branches.contains(&key) {
                return Err(OrgMoverError::new(OrgMoverErrorKind::GetBranches));
            }
            Ok(self
                .branches
                .get(&key)
                .map(|branches| branches.iter().map(|(name, _)| name.clone()).collect())
                .unwrap_or_default())
        })
    }

    fn get_branch_head<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> PlatformFuture<'a, String> {
        Box::pin(async move {
            self.branches
                .get(&key(org, repo))
                .and_then(|branches| branches.iter().find(|(name, _)| name == branch))
                .map(|(_, sha)| sha.clone())
                .ok_or_else(|| OrgMoverError::new(OrgMoverErrorKind::GetBranchHead))
        })
    }

    fn create_repo<'a>(
        &'a self,
        org: &'a str,
        repo: &'a RepoCreation,
    ) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            *self.create_attempts.lock().unwrap() += 1;
            if self.failing_creations.contains(&repo.name) {
                return Err(OrgMoverError::new(OrgMoverErrorKind::RepoCreation));
            }
            self.created
                .lock()
                .unwrap()
                .push((org.to_string(), repo.clone()));
            Ok(())
        })
    }

    fn clone_url(&self, org: &str, repo: &str) -> String {
        format!("mock://{org}/{repo}.git")
    }

    fn get_type(&self) -> PlatformType {
        PlatformType::Api
    }
}

/// Transport recording its calls
///
/// Calls are logged as `clone:org/repo` and `push:org/repo`. A clone creates the
/// target directory, even when it fails, like an interrupted `git clone` would.
#[derive(Default)]
pub(crate) struct MockTransport {
    clone_failures: Mutex<HashMap<String, usize>>,
    push_failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
}

/// `org/repo` from a mock URL
fn target(url: &str) -> String {
    url.trim_start_matches("mock://")
        .trim_end_matches(".git")
        .to_string()
}

/// Repository name of a mock URL
fn repo_name(url: &str) -> String {
    target(url).rsplit('/').next().unwrap_or_default().to_string()
}

/// Consume one pending failure for `name`
fn take_failure(failures: &Mutex<HashMap<String, usize>>, name: &str) -> bool {
    let mut failures = failures.lock().unwrap();
    match failures.get_mut(name) {
        Some(left) if *left > 0 => {
            *left -= 1;
            true
        }
        _ => false,
    }
}

impl MockTransport {
    /// Fail the first `times` clones of `name`
    pub(crate) fn failing_clone(self, name: &str, times: usize) -> Self {
        self.clone_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), times);
        self
    }

    /// Fail the first `times` pushes of `name`
    pub(crate) fn failing_push(self, name: &str, times: usize) -> Self {
        self.push_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), times);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl GitTransport for MockTransport {
    fn check_available(&self) -> TransportFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn clone_mirror<'a>(&'a self, url: &'a str, path: &'a Path) -> TransportFuture<'a> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push(format!("clone:{}", target(url)));
            std::fs::create_dir_all(path)?;
            if take_failure(&self.clone_failures, &repo_name(url)) {
                return Err(OrgMoverError::new(OrgMoverErrorKind::Command)
                    .with_text("fatal: unable to access remote"));
            }
            Ok(())
        })
    }

    fn push_mirror<'a>(&'a self, path: &'a Path, url: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push(format!("push:{}", target(url)));
            if !path.is_dir() {
                return Err("nothing to push".into());
            }
            if take_failure(&self.push_failures, &repo_name(url)) {
                return Err(OrgMoverError::new(OrgMoverErrorKind::Command)
                    .with_text("error: failed to push some refs"));
            }
            Ok(())
        })
    }
}
