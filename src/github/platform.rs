//! Github Platform
use super::{
    repo::{BranchGithub, ContentGithub, RepoGithub},
    GITHUB_API_HEADER, GITHUB_API_VERSION, PER_PAGE, REPO_LIST_LIMIT,
};
use crate::{
    errors::{OrgMoverError, OrgMoverErrorKind},
    gh::platform::encode_branch,
    platform::{Platform, PlatformFuture, PlatformType, RepoCreation},
    utils::{decode_base64_content, Repo},
};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response};
use url::Url;
use urlencoding::encode;

/// Github Platform
#[derive(Debug, Clone)]
pub struct GithubPlatform {
    /// REST API base URL, without trailing slash
    api_url: String,

    /// Git host
    host: String,

    /// Github token
    token: String,

    /// Reqwest client
    client: reqwest::Client,
}

impl GithubPlatform {
    /// Create a new GithubPlatform
    /// # Errors
    /// Error if `api_url` isn't an URL
    pub(crate) fn new(api_url: &str, host: &str, token: String) -> Result<Self, OrgMoverError> {
        let parsed = Url::parse(api_url)
            .map_err(|e| OrgMoverError::new_with_source(&format!("Invalid API URL {api_url}"), e))?;
        Ok(Self {
            api_url: parsed.as_str().trim_end_matches('/').to_string(),
            host: host.to_string(),
            token,
            client: reqwest::Client::new(),
        })
    }

    /// Request with the GitHub headers
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.api_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .header(GITHUB_API_HEADER, GITHUB_API_VERSION)
    }

    /// Turn an unsuccessful response into an error of `kind`
    async fn check(
        response: Response,
        kind: OrgMoverErrorKind,
        org: &str,
    ) -> Result<Response, OrgMoverError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await?;
        Err(OrgMoverError::new(kind)
            .with_org(org)
            .with_text(&format!("{status} - {text}")))
    }

    /// Walk the pages of a listing endpoint
    async fn get_pages<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        limit: usize,
        kind: OrgMoverErrorKind,
        org: &str,
    ) -> Result<Vec<T>, OrgMoverError> {
        let mut page: usize = 1;
        let mut items = vec![];
        loop {
            let response = self
                .request(Method::GET, path)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())])
                .send()
                .await?;
            let text = Self::check(response, kind.clone(), org).await?.text().await?;
            let batch: Vec<T> = serde_json::from_str(&text)?;
            let last = batch.len() < PER_PAGE;
            log::debug!("Requested github {path} (page {page}): {}", batch.len());
            items.extend(batch);
            if last || items.len() >= limit {
                break;
            }
            page += 1;
        }
        items.truncate(limit);
        Ok(items)
    }
}

/// API path of a repository
fn repo_path(org: &str, repo: &str) -> String {
    format!("/repos/{}/{}", encode(org), encode(repo))
}

impl Platform for GithubPlatform {
    fn check_prerequisites(&self) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            let response = self.request(Method::GET, "/user").send().await?;
            if !response.status().is_success() {
                return Err(OrgMoverError::new(OrgMoverErrorKind::Prerequisite).with_text(
                    &format!(
                        "GitHub token rejected ({}). Create one at https://github.com/settings/personal-access-tokens",
                        response.status()
                    ),
                ));
            }
            println!("✓ GitHub token accepted");
            Ok(())
        })
    }

    fn check_access<'a>(&'a self, org: &'a str) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/orgs/{}", encode(org));
            let response = self.request(Method::GET, &path).send().await?;
            Self::check(response, OrgMoverErrorKind::OrgAccess, org).await?;
            Ok(())
        })
    }

    fn get_all_repos<'a>(&'a self, org: &'a str) -> PlatformFuture<'a, Vec<Repo>> {
        Box::pin(async move {
            let path = format!("/orgs/{}/repos", encode(org));
            let repos: Vec<RepoGithub> = self
                .get_pages(&path, REPO_LIST_LIMIT, OrgMoverErrorKind::GetAllRepos, org)
                .await?;
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
            let path = format!("{}/contents/{}", repo_path(org, repo), encode(path));
            let response = self.request(Method::GET, &path).send().await?;
            let text = Self::check(response, OrgMoverErrorKind::GetFile, org)
                .await?
                .text()
                .await?;
            let content: ContentGithub = serde_json::from_str(&text)?;
            if content.encoding != "base64" {
                return Err(OrgMoverError::new(OrgMoverErrorKind::GetFile)
                    .with_org(org)
                    .with_text(&format!("Unexpected encoding '{}'", content.encoding)));
            }
            decode_base64_content(&content.content)
        })
    }

    fn list_branches<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
    ) -> PlatformFuture<'a, Vec<String>> {
        Box::pin(async move {
            let path = format!("{}/branches", repo_path(org, repo));
            let branches: Vec<BranchGithub> = self
                .get_pages(&path, usize::MAX, OrgMoverErrorKind::GetBranches, org)
                .await?;
            Ok(branches.into_iter().map(|b| b.name).collect())
        })
    }

    fn get_branch_head<'a>(
        &'a self,
        org: &'a str,
        repo: &'a str,
        branch: &'a str,
    ) -> PlatformFuture<'a, String> {
        Box::pin(async move {
            let path = format!("{}/branches/{}", repo_path(org, repo), encode_branch(branch));
            let response = self.request(Method::GET, &path).send().await?;
            let text = Self::check(response, OrgMoverErrorKind::GetBranchHead, org)
                .await?
                .text()
                .await?;
            let branch: BranchGithub = serde_json::from_str(&text)?;
            Ok(branch.commit.sha)
        })
    }

    fn create_repo<'a>(
        &'a self,
        org: &'a str,
        repo: &'a RepoCreation,
    ) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/orgs/{}/repos", encode(org));
            let response = self.request(Method::POST, &path).json(repo).send().await?;
            Self::check(response, OrgMoverErrorKind::RepoCreation, org).await?;
            Ok(())
        })
    }

    fn clone_url(&self, org: &str, repo: &str) -> String {
        format!("https://{}/{org}/{repo}.git", self.host)
    }

    fn get_type(&self) -> PlatformType {
        PlatformType::Api
    }
}
