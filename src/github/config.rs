//! Github configuration
use super::{platform::GithubPlatform, GITHUB_API_URL, GITHUB_URL};
use serde::{Deserialize, Serialize};

use crate::{
    config::OrgMoverConfig, config_password_wrap, errors::OrgMoverError, git::GitCredentials,
};

/// Environment variables checked for a token, in order
const TOKEN_VARIABLES: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Github configuration
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    /// Github token
    pub token: Option<String>,

    /// REST API base URL, for GitHub Enterprise
    pub api_url: Option<String>,

    /// Git host, for GitHub Enterprise
    pub host: Option<String>,
}

impl GithubConfig {
    /// Token from the environment
    fn token_from_env() -> Option<String> {
        TOKEN_VARIABLES
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|token| !token.is_empty())
    }

    /// Get the github token, asking for it when unknown
    /// # Errors
    /// Error if the token can't be read or saved
    pub fn get_token(config: &mut OrgMoverConfig) -> Result<String, OrgMoverError> {
        if let Some(token) = Self::token_from_env() {
            return Ok(token);
        }
        Ok(config_password_wrap!(
            config,
            github,
            GithubConfig,
            token,
            "your github token (https://github.com/settings/personal-access-tokens)"
        ))
    }

    /// REST API base URL
    pub fn api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| GITHUB_API_URL.to_string())
    }

    /// Git host
    pub fn host(&self) -> String {
        self.host.clone().unwrap_or_else(|| GITHUB_URL.to_string())
    }

    /// Get the github platform
    /// # Errors
    /// Error if the token can't be obtained or the API URL is invalid
    pub fn get_platform(config: &mut OrgMoverConfig) -> Result<GithubPlatform, OrgMoverError> {
        let token = Self::get_token(config)?;
        let github = config.config_data.github.clone().unwrap_or_default();
        GithubPlatform::new(&github.api_url(), &github.host(), token)
    }

    /// Get the credentials used by git
    /// # Errors
    /// Error if the token can't be obtained
    pub fn get_credentials(config: &mut OrgMoverConfig) -> Result<GitCredentials, OrgMoverError> {
        Ok(GitCredentials::from_token(&Self::get_token(config)?))
    }
}
