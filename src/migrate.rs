//! Migrate repositories from one organization to another
//!
//! Every repository goes through the same steps: clone a mirror into a temporary
//! directory, create the destination repository, push the mirror, remove the
//! temporary directory. Clone and push are retried, creation is not. A failing
//! repository is logged and the loop moves on to the next one.
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::{distr::Alphanumeric, rng, Rng};

use crate::conflict::{verify_conflicts, Classification, ConflictResolution};
use crate::errors::{OrgMoverError, OrgMoverErrorKind};
use crate::git::GitTransport;
use crate::inventory::{get_repos_with_details, sort_by_creation};
use crate::ledger::{Ledger, RunLog};
use crate::platform::{Platform, RepoCreation};
use crate::utils::Repo;

/// Attempts for clone and push
pub const MAX_ATTEMPTS: u32 = 3;

/// Pause between two attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// How transient steps are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,

    /// Fixed pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// Where a repository stands in its migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// Not started
    Pending,
    /// Cloning the source mirror
    Cloning,
    /// Destination repository created
    Created,
    /// Pushing the mirror to the destination
    Pushing,
    /// Removing the temporary clone
    CleaningUp,
    /// Done
    Completed,
    /// Given up
    Failed,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Cloning => write!(f, "cloning"),
            Self::Created => write!(f, "created"),
            Self::Pushing => write!(f, "pushing"),
            Self::CleaningUp => write!(f, "cleaning up"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of the migration of one repository
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    /// Repository name
    pub name: String,

    /// `Completed` or `Failed`
    pub state: MigrationState,

    /// Time spent on the repository
    pub elapsed: Duration,

    /// Why the migration failed
    pub error: Option<String>,
}

impl MigrationOutcome {
    /// Whether the repository was migrated
    pub fn success(&self) -> bool {
        self.state == MigrationState::Completed
    }
}

/// Counters of a whole run
#[derive(Debug, Clone, Default)]
pub struct MigrationSummary {
    /// Repositories processed
    pub attempted: usize,

    /// Repositories migrated
    pub succeeded: usize,

    /// Repositories given up
    pub failed: usize,

    /// Per repository outcomes, in processing order
    pub outcomes: Vec<MigrationOutcome>,
}

impl MigrationSummary {
    /// Account for one outcome
    fn record(&mut self, outcome: MigrationOutcome) {
        self.attempted += 1;
        if outcome.success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Everything known before the first clone
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Source repositories, oldest first
    pub source_repos: Vec<Repo>,

    /// Destination repositories, oldest first
    pub dest_repos: Vec<Repo>,

    /// Verdicts on names present on both sides
    pub resolutions: Vec<ConflictResolution>,

    /// Source repositories not in the ledger, oldest first
    pub remaining: Vec<Repo>,
}

impl MigrationPlan {
    /// Number of verified duplicates
    pub fn duplicates(&self) -> usize {
        self.resolutions.iter().filter(|r| r.is_duplicate()).count()
    }
}

/// Source repositories still to migrate, oldest first
pub fn remaining_repos(repos: &[Repo], ledger: &dyn Ledger) -> Vec<Repo> {
    let mut remaining: Vec<Repo> = repos
        .iter()
        .filter(|repo| !ledger.contains(&repo.name))
        .cloned()
        .collect();
    sort_by_creation(&mut remaining);
    remaining
}

/// Inventory both organizations, verify conflicts and compute the remaining work
///
/// Verified duplicates are written to the ledger before the remaining work is
/// computed, so they are never migrated.
/// # Errors
/// Error if an inventory fails or a name exists on both sides with different content
pub async fn prepare_migration(
    platform: &dyn Platform,
    source_org: &str,
    dest_org: &str,
    ledger: &mut dyn Ledger,
) -> Result<MigrationPlan, OrgMoverError> {
    let mut source_repos = get_repos_with_details(platform, source_org).await?;
    let mut dest_repos = get_repos_with_details(platform, dest_org).await?;
    println!("✓ {} repos found in {source_org}", source_repos.len());
    println!("✓ {} repos found in {dest_org}", dest_repos.len());
    println!();

    let resolutions =
        verify_conflicts(platform, source_org, dest_org, &source_repos, &dest_repos).await;
    let divergent: Vec<String> = resolutions
        .iter()
        .filter(|r| r.classification == Classification::DivergentConflict)
        .map(|r| format!("{} ({})", r.repo_name, r.reason))
        .collect();
    if !divergent.is_empty() {
        return Err(OrgMoverError::new(OrgMoverErrorKind::Conflict).with_text(&format!(
            "Non-duplicate repositories with matching names found: {}",
            divergent.join(", ")
        )));
    }
    for resolution in resolutions.iter().filter(|r| r.is_duplicate()) {
        if !ledger.contains(&resolution.repo_name) {
            ledger.mark_complete(&resolution.repo_name)?;
        }
    }

    sort_by_creation(&mut source_repos);
    sort_by_creation(&mut dest_repos);
    let remaining = remaining_repos(&source_repos, ledger);
    Ok(MigrationPlan {
        source_repos,
        dest_repos,
        resolutions,
        remaining,
    })
}

/// Replace double quotes, which `gh` and shells handle badly
pub fn sanitize_description(description: Option<&str>) -> Option<String> {
    description
        .filter(|d| !d.is_empty())
        .map(|d| d.replace('"', "'"))
}

/// Unique temporary path for the mirror of `name`
fn temp_repo_path(temp_dir: &Path, name: &str) -> PathBuf {
    let suffix: String = rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    temp_dir.join(format!("{name}-{suffix}.git"))
}

/// Remove a directory, ignoring every error
fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::debug!("Unable to remove {}: {e}", path.display());
        }
    }
}

/// Success and error logs of a run
#[derive(Debug, Clone)]
pub struct MigrationLogs {
    /// Log of migrated repositories
    pub success: RunLog,

    /// Log of failed repositories
    pub errors: RunLog,
}

/// Migrates repositories one after the other
pub struct Migrator<'a> {
    /// Hosting backend
    platform: &'a dyn Platform,

    /// Git backend
    transport: &'a dyn GitTransport,

    /// Organization to copy from
    source_org: &'a str,

    /// Organization to copy to
    dest_org: &'a str,

    /// Directory receiving the temporary mirrors
    temp_dir: &'a Path,

    /// Success and error logs
    logs: MigrationLogs,

    /// Retry policy of clone and push
    retry: RetryPolicy,
}

impl<'a> Migrator<'a> {
    /// Create a migrator with the default retry policy
    pub fn new(
        platform: &'a dyn Platform,
        transport: &'a dyn GitTransport,
        source_org: &'a str,
        dest_org: &'a str,
        temp_dir: &'a Path,
        logs: MigrationLogs,
    ) -> Self {
        Self {
            platform,
            transport,
            source_org,
            dest_org,
            temp_dir,
            logs,
            retry: RetryPolicy::default(),
        }
    }

    /// Use another retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run `step` until it succeeds or the attempts are exhausted
    async fn retrying<F, Fut>(&self, label: &str, mut step: F) -> Result<(), OrgMoverError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), OrgMoverError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match step().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts => {
                    log::debug!("{label} attempt {attempt} failed: {e}");
                    println!("  → {label} attempt {attempt} failed, retrying...");
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Clone, create and push, updating `state` along the way
    async fn transfer(
        &self,
        repo: &Repo,
        path: &Path,
        state: &mut MigrationState,
    ) -> Result<(), OrgMoverError> {
        *state = MigrationState::Cloning;
        println!("  → Cloning from {}...", self.source_org);
        let clone_url = self.platform.clone_url(self.source_org, &repo.name);
        self.retrying("Clone", || {
            // a failed attempt may leave a partial clone behind
            remove_quietly(path);
            self.transport.clone_mirror(&clone_url, path)
        })
        .await?;

        println!("  → Creating in {}...", self.dest_org);
        let creation = RepoCreation {
            name: repo.name.clone(),
            private: repo.private,
            description: sanitize_description(repo.description.as_deref()),
        };
        self.platform.create_repo(self.dest_org, &creation).await?;
        *state = MigrationState::Created;

        println!("  → Pushing to {}...", self.dest_org);
        *state = MigrationState::Pushing;
        let push_url = self.platform.clone_url(self.dest_org, &repo.name);
        self.retrying("Push", || self.transport.push_mirror(path, &push_url))
            .await
    }

    /// Migrate one repository, never failing the whole run
    pub async fn migrate_one(&self, repo: &Repo, ledger: &mut dyn Ledger) -> MigrationOutcome {
        let start = Instant::now();
        let path = temp_repo_path(self.temp_dir, &repo.name);
        let mut reached = MigrationState::Pending;
        let result = self.transfer(repo, &path, &mut reached).await;

        log::debug!("{}: {}", repo.name, MigrationState::CleaningUp);
        println!("  → Cleaning up...");
        remove_quietly(&path);

        let result = match result {
            Ok(()) => ledger.mark_complete(&repo.name),
            Err(e) => {
                log::debug!("{} failed while {reached}", repo.name);
                Err(e)
            }
        };
        let elapsed = start.elapsed();
        let (state, error) = match result {
            Ok(()) => {
                let message = format!(
                    "✓ {} complete (took {:.1}s)",
                    repo.name,
                    elapsed.as_secs_f64()
                );
                println!("{message}");
                if let Err(e) = self.logs.success.append(&message) {
                    log::warn!("Unable to write the success log: {e}");
                }
                (MigrationState::Completed, None)
            }
            Err(e) => {
                let message = format!(
                    "✗ {} FAILED after {:.1}s: {e}",
                    repo.name,
                    elapsed.as_secs_f64()
                );
                println!("{message}");
                if let Err(e) = self.logs.errors.append(&message) {
                    log::warn!("Unable to write the error log: {e}");
                }
                (MigrationState::Failed, Some(e.to_string()))
            }
        };
        println!();
        MigrationOutcome {
            name: repo.name.clone(),
            state,
            elapsed,
            error,
        }
    }

    /// Migrate every repository not yet in the ledger, in the given order
    pub async fn migrate_all(&self, repos: &[Repo], ledger: &mut dyn Ledger) -> MigrationSummary {
        let mut summary = MigrationSummary::default();
        let total = repos.len();
        for (idx, repo) in repos.iter().enumerate() {
            if ledger.contains(&repo.name) {
                log::debug!("Skipping {}, already migrated", repo.name);
                continue;
            }
            println!("[{}/{total}] Processing: {}", idx + 1, repo.name);
            if repo.uses_lfs {
                println!("  ⚠ This repo uses Git LFS");
            }
            summary.record(self.migrate_one(repo, ledger).await);
        }
        summary
    }
}
