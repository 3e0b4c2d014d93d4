//! Platform implementation driving the `gh` command line client
use urlencoding::encode;

use super::{repo::GhRepo, REPO_LIST_FIELDS, REPO_LIST_LIMIT};
use crate::{
    command::ExternalCommand,
    errors::{OrgMoverError, OrgMoverErrorKind},
    platform::{Platform, PlatformFuture, PlatformType, RepoCreation},
    utils::{decode_base64_content, Repo},
};

/// Default GitHub host
pub(crate) const GITHUB_HOST: &str = "github.com";

/// GitHub accessed through `gh`
#[derive(Debug, Clone)]
pub struct GhPlatform {
    /// GitHub host, `github.com` unless GitHub Enterprise is used
    host: String,
}

impl Default for GhPlatform {
    fn default() -> Self {
        Self::new(GITHUB_HOST.to_string())
    }
}

impl GhPlatform {
    /// Create a new gh platform
    pub(crate) fn new(host: String) -> Self {
        Self { host }
    }

    /// Base `gh` command, targeting the configured host
    pub(crate) fn gh(&self) -> ExternalCommand {
        let command = ExternalCommand::new("gh");
        if self.host == GITHUB_HOST {
            command
        } else {
            command.env("GH_HOST", &self.host)
        }
    }

    /// `gh api <endpoint> --jq <filter>`
    pub(crate) fn api(&self, endpoint: &str, jq: &str) -> ExternalCommand {
        self.gh().args(["api", endpoint, "--jq", jq])
    }

    /// `gh repo create` arguments for a new repository
    pub(crate) fn create_command(&self, org: &str, repo: &RepoCreation) -> ExternalCommand {
        let visibility = if repo.private { "--private" } else { "--public" };
        let command = self
            .gh()
            .args(["repo", "create"])
            .arg(format!("{org}/{}", repo.name))
            .args([visibility, "--clone=false"]);
        match &repo.description {
            Some(description) => command.arg("--description").arg(description),
            None => command,
        }
    }
}

/// API path of a repository
fn repo_endpoint(org: &str, repo: &str) -> String {
    format!("/repos/{}/{}", encode(org), encode(repo))
}

/// Encode a branch name for a path, keeping its slashes
pub(crate) fn encode_branch(branch: &str) -> String {
    branch
        .split('/')
        .map(|segment| encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl Platform for GhPlatform {
    fn check_prerequisites(&self) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            if let Err(e) = self.gh().arg("--version").checked().await {
                return Err(OrgMoverError::new(OrgMoverErrorKind::Prerequisite).with_text(
                    &format!("gh CLI is not installed ({e}). Install from: https://cli.github.com/"),
                ));
            }
            println!("✓ gh CLI installed");
            if let Err(e) = self.gh().args(["auth", "status"]).checked().await {
                return Err(OrgMoverError::new(OrgMoverErrorKind::Prerequisite)
                    .with_text(&format!("gh is not authenticated ({e}). Run: gh auth login")));
            }
            println!("✓ gh authenticated");
            match self.gh().args(["auth", "setup-git"]).checked().await {
                Ok(_) => println!("✓ git configured to use gh credentials"),
                Err(e) => {
                    log::warn!("Could not configure git to use gh credentials: {e}");
                    println!("WARNING: Could not configure git to use gh credentials");
                    println!("You may need to run: gh auth setup-git");
                }
            }
            Ok(())
        })
    }

    fn check_access<'a>(&'a self, org: &'a str) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            self.gh()
                .args(["repo", "list", org, "--limit", "1", "--json", "name"])
                .checked()
                .await
                .map_err(|e| {
                    OrgMoverError::new(OrgMoverErrorKind::OrgAccess)
                        .with_org(org)
                        .with_text(&format!(
                            "Cannot access organization '{org}'. Make sure you have access and the org name is correct ({e})"
                        ))
                })?;
            Ok(())
        })
    }

    fn get_all_repos<'a>(&'a self, org: &'a str) -> PlatformFuture<'a, Vec<Repo>> {
        Box::pin(async move {
            let output = self
                .gh()
                .args(["repo", "list", org])
                .args(["--limit", REPO_LIST_LIMIT, "--json", REPO_LIST_FIELDS])
                .checked()
                .await?;
            let repos: Vec<GhRepo> = serde_json::from_str(&output.stdout)?;
            Ok(repos.into_iter().map(Repo::from).collect())
        })
    }

    fn get_file_content<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        path: &'a str,
    ) -> PlatformFuture<'a, String> {
        Box::pin(async move {
            let endpoint = format!("{}/contents/{}", repo_endpoint(org, repo), encode(path));
            let output = self.api(&endpoint, ".content").output().await?;
            if !output.success() {
                return Err(OrgMoverError::new(OrgMoverErrorKind::GetFile)
                    .with_org(org)
                    .with_text(output.stderr.trim()));
            }
            decode_base64_content(&output.stdout)
        })
    }

    fn list_branches<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
    ) -> PlatformFuture<'a, Vec<String>> {
        Box::pin(async move {
            let endpoint = format!("{}/branches", repo_endpoint(org, repo));
            let output = self
                .api(&endpoint, ".[].name")
                .arg("--paginate")
                .checked()
                .await
                .map_err(|e| {
                    OrgMoverError::new(OrgMoverErrorKind::GetBranches)
                        .with_org(org)
                        .with_text(&e.to_string())
                })?;
            Ok(output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect())
        })
    }

    fn get_branch_head<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> PlatformFuture<'a, String> {
        Box::pin(async move {
            let endpoint = format!(
                "{}/branches/{}",
                repo_endpoint(org, repo),
                encode_branch(branch)
            );
            let output = self
                .api(&endpoint, ".commit.sha")
                .checked()
                .await
                .map_err(|e| {
                    OrgMoverError::new(OrgMoverErrorKind::GetBranchHead)
                        .with_org(org)
                        .with_text(&e.to_string())
                })?;
            Ok(output.stdout.trim().to_string())
        })
    }

    fn create_repo<'a>(
        &'a self,
        org: &'a str,
        repo: &'a RepoCreation,
    ) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            self.create_command(org, repo)
                .checked()
                .await
                .map_err(|e| {
                    OrgMoverError::new(OrgMoverErrorKind::RepoCreation)
                        .with_org(org)
                        .with_text(&e.to_string())
                })?;
            Ok(())
        })
    }

    fn clone_url(&self, org: &str, repo: &str) -> String {
        format!("https://{}/{org}/{repo}.git", self.host)
    }

    fn get_type(&self) -> PlatformType {
        PlatformType::Gh
    }
}
