//! Repository inventory of an organization
use indicatif::{ProgressBar, ProgressStyle};

use crate::errors::{OrgMoverError, OrgMoverErrorKind};
use crate::platform::Platform;
use crate::utils::Repo;

/// Marker of a Git LFS tracked pattern in `.gitattributes`
const LFS_FILTER: &str = "filter=lfs";

/// File holding the LFS configuration of a repository
const GITATTRIBUTES: &str = ".gitattributes";

/// Whether a `.gitattributes` content routes files through Git LFS
pub(crate) fn uses_lfs(gitattributes: &str) -> bool {
    gitattributes.contains(LFS_FILTER)
}

/// Check if a repository uses Git LFS, any failure meaning it doesn't
pub(crate) async fn check_repo_for_lfs(platform: &dyn Platform, org: &str, repo: &str) -> bool {
    match platform.get_file_content(org, repo, GITATTRIBUTES).await {
        Ok(content) => uses_lfs(&content),
        Err(e) => {
            log::debug!("No {GITATTRIBUTES} for {org}/{repo}: {e}");
            false
        }
    }
}

/// Sort repositories oldest first
pub(crate) fn sort_by_creation(repos: &mut [Repo]) {
    repos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}

/// Progress bar of the LFS scan
fn scan_progress(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("  Checking {pos}/{len}: {wide_msg}") {
        pb.set_style(style);
    }
    pb
}

/// Fetch all repos of an organization, with their LFS usage
/// # Errors
/// Error if the repositories can't be listed
pub async fn get_repos_with_details(
    platform: &dyn Platform,
    org: &str,
) -> Result<Vec<Repo>, OrgMoverError> {
    println!("Fetching repos from {org}...");
    let mut repos = platform.get_all_repos(org).await.map_err(|e| {
        OrgMoverError::new(OrgMoverErrorKind::GetAllRepos)
            .with_org(org)
            .with_text(&format!("Failed to fetch repos from {org}: {e}"))
    })?;

    println!("Checking {} repos for Git LFS usage...", repos.len());
    let pb = scan_progress(repos.len());
    for repo in repos.iter_mut() {
        pb.set_message(repo.name.clone());
        repo.uses_lfs = check_repo_for_lfs(platform, org, &repo.name).await;
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(repos)
}
