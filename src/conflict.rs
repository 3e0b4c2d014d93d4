//! Verification of repositories present on both sides
//!
//! GitHub names are case-insensitive, so `Tool` in the source and `tool` in the
//! destination are the same repository. Such a pair is only accepted when the
//! destination is an exact copy: same branches, same head commit on each branch.
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::OrgMoverError;
use crate::platform::Platform;
use crate::utils::Repo;

/// Verdict on a repository name present on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The destination already holds an identical copy
    VerifiedDuplicate,

    /// The destination holds something else under the same name
    DivergentConflict,
}

/// Result of the verification of one colliding name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictResolution {
    /// Name of the repository in the source organization
    pub repo_name: String,

    /// Verdict
    pub classification: Classification,

    /// Human readable explanation
    pub reason: String,
}

impl ConflictResolution {
    /// Build a divergent resolution
    fn divergent(repo_name: &str, reason: String) -> Self {
        Self {
            repo_name: repo_name.to_string(),
            classification: Classification::DivergentConflict,
            reason,
        }
    }

    /// Whether the destination is an identical copy
    pub fn is_duplicate(&self) -> bool {
        self.classification == Classification::VerifiedDuplicate
    }
}

/// Pair of names colliding case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    /// Name in the source organization
    pub source_name: String,

    /// Name in the destination organization
    pub dest_name: String,
}

/// Index repository names by their lowercase form
fn name_index(repos: &[Repo]) -> BTreeMap<String, &str> {
    repos
        .iter()
        .map(|repo| (repo.name.to_lowercase(), repo.name.as_str()))
        .collect()
}

/// Names present on both sides, sorted by lowercase name
pub fn find_collisions(source: &[Repo], destination: &[Repo]) -> Vec<NameCollision> {
    let dest_index = name_index(destination);
    name_index(source)
        .into_iter()
        .filter_map(|(lower, source_name)| {
            dest_index.get(&lower).map(|dest_name| NameCollision {
                source_name: source_name.to_string(),
                dest_name: dest_name.to_string(),
            })
        })
        .collect()
}

/// Compare branches and head commits of both copies
async fn compare_branches(
    platform: &dyn Platform,
    source_org: &str,
    dest_org: &str,
    collision: &NameCollision,
) -> Result<Option<String>, OrgMoverError> {
    let source_branches: BTreeSet<String> = platform
        .list_branches(source_org, &collision.source_name)
        .await?
        .into_iter()
        .collect();
    let dest_branches: BTreeSet<String> = platform
        .list_branches(dest_org, &collision.dest_name)
        .await?
        .into_iter()
        .collect();
    if source_branches != dest_branches {
        return Ok(Some("branch names don't match".to_string()));
    }
    for branch in &source_branches {
        let source_sha = platform
            .get_branch_head(source_org, &collision.source_name, branch)
            .await?;
        let dest_sha = platform
            .get_branch_head(dest_org, &collision.dest_name, branch)
            .await?;
        if source_sha != dest_sha {
            return Ok(Some(format!("branch '{branch}' has different commits")));
        }
    }
    Ok(None)
}

/// Decide whether the destination copy is identical to the source one
pub async fn compare_repos(
    platform: &dyn Platform,
    source_org: &str,
    dest_org: &str,
    collision: &NameCollision,
) -> ConflictResolution {
    let name = &collision.source_name;
    match compare_branches(platform, source_org, dest_org, collision).await {
        Ok(None) => ConflictResolution {
            repo_name: name.clone(),
            classification: Classification::VerifiedDuplicate,
            reason: "repos are identical".to_string(),
        },
        Ok(Some(reason)) => ConflictResolution::divergent(name, reason),
        Err(e) => ConflictResolution::divergent(name, format!("error comparing: {e}")),
    }
}

/// Verify every name present in both organizations
pub async fn verify_conflicts(
    platform: &dyn Platform,
    source_org: &str,
    dest_org: &str,
    source: &[Repo],
    destination: &[Repo],
) -> Vec<ConflictResolution> {
    let mut resolutions = vec![];
    for collision in find_collisions(source, destination) {
        log::debug!(
            "Comparing {source_org}/{} with {dest_org}/{}",
            collision.source_name,
            collision.dest_name
        );
        resolutions.push(compare_repos(platform, source_org, dest_org, &collision).await);
    }
    resolutions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{repo, MockPlatform};

    fn names(list: &[&str]) -> Vec<Repo> {
        list.iter()
            .map(|name| repo(name, "2020-01-01T00:00:00Z"))
            .collect()
    }

    #[test]
    fn collisions_are_case_insensitive_and_sorted() {
        let collisions = find_collisions(
            &names(&["Zeta", "alpha", "Beta", "unique"]),
            &names(&["zeta", "ALPHA", "beta", "other"]),
        );
        let pairs: Vec<_> = collisions
            .iter()
            .map(|c| (c.source_name.as_str(), c.dest_name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [("alpha", "ALPHA"), ("Beta", "beta"), ("Zeta", "zeta")]
        );
    }

    #[test]
    fn no_collisions() {
        assert!(find_collisions(&names(&["a", "b"]), &names(&["c"])).is_empty());
        assert!(find_collisions(&names(&["a"]), &[]).is_empty());
    }

    #[tokio::test]
    async fn identical_copy_with_different_case_is_duplicate() {
        let platform = MockPlatform::default()
            .with_repo("src", repo("X", "2020-01-01T00:00:00Z"))
            .with_repo("dst", repo("x", "2020-01-01T00:00:00Z"))
            .with_branch("src", "X", "main", "aaa")
            .with_branch("src", "X", "dev", "bbb")
            .with_branch("dst", "x", "main", "aaa")
            .with_branch("dst", "x", "dev", "bbb");

        let resolutions = verify_conflicts(
            &platform,
            "src",
            "dst",
            &names(&["X"]),
            &names(&["x"]),
        )
        .await;
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].repo_name, "X");
        assert!(resolutions[0].is_duplicate());
    }

    #[tokio::test]
    async fn different_branch_sets_diverge() {
        let platform = MockPlatform::default()
            .with_branch("src", "tool", "main", "aaa")
            .with_branch("src", "tool", "feature", "ccc")
            .with_branch("dst", "tool", "main", "aaa");
        let collision = NameCollision {
            source_name: "tool".to_string(),
            dest_name: "tool".to_string(),
        };
        let resolution = compare_repos(&platform, "src", "dst", &collision).await;
        assert_eq!(resolution.classification, Classification::DivergentConflict);
        assert_eq!(resolution.reason, "branch names don't match");
    }

    #[tokio::test]
    async fn different_head_diverges_naming_branch() {
        let platform = MockPlatform::default()
            .with_branch("src", "Y", "main", "aaa")
            .with_branch("dst", "Y", "main", "fff");
        let collision = NameCollision {
            source_name: "Y".to_string(),
            dest_name: "Y".to_string(),
        };
        let resolution = compare_repos(&platform, "src", "dst", &collision).await;
        assert_eq!(resolution.classification, Classification::DivergentConflict);
        assert!(resolution.reason.contains("'main'"));
    }

    #[tokio::test]
    async fn every_branch_head_is_compared() {
        let platform = MockPlatform::default()
            .with_branch("src", "tool", "main", "aaa")
            .with_branch("src", "tool", "release/1.0", "bbb")
            .with_branch("dst", "tool", "main", "aaa")
            .with_branch("dst", "tool", "release/1.0", "ccc");
        let collision = NameCollision {
            source_name: "tool".to_string(),
            dest_name: "tool".to_string(),
        };
        let resolution = compare_repos(&platform, "src", "dst", &collision).await;
        assert_eq!(resolution.classification, Classification::DivergentConflict);
        assert_eq!(resolution.reason, "branch 'release/1.0' has different commits");
    }

    #[tokio::test]
    async fn api_error_fails_closed() {
        let platform = MockPlatform::default()
            .with_branch("src", "tool", "main", "aaa")
            .with_branch("dst", "tool", "main", "aaa")
            .failing_branches("dst", "tool");
        let collision = NameCollision {
            source_name: "tool".to_string(),
            dest_name: "tool".to_string(),
        };
        let resolution = compare_repos(&platform, "src", "dst", &collision).await;
        assert_eq!(resolution.classification, Classification::DivergentConflict);
        assert!(resolution.reason.starts_with("error comparing"));
    }

    #[tokio::test]
    async fn empty_repositories_on_both_sides_are_duplicates() {
        let platform = MockPlatform::default();
        let collision = NameCollision {
            source_name: "empty".to_string(),
            dest_name: "Empty".to_string(),
        };
        let resolution = compare_repos(&platform, "src", "dst", &collision).await;
        assert!(resolution.is_duplicate());
    }
}
