//! Git transport backed by the `git` binary
use std::path::Path;

use super::{GitCredentials, GitTransport, TransportFuture};
use crate::command::ExternalCommand;
use crate::errors::{OrgMoverError, OrgMoverErrorKind};

/// Transport running `git clone --mirror` and `git push --mirror`
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    /// Credentials sent as an HTTP header, when git isn't configured for the host
    credentials: Option<GitCredentials>,
}

impl GitCli {
    /// Create a new git transport
    pub(crate) fn new(credentials: Option<GitCredentials>) -> Self {
        Self { credentials }
    }

    /// Base `git` command
    ///
    /// Credentials go through `GIT_CONFIG_*` variables so they never show up in
    /// the command line, and so never in error messages.
    pub(crate) fn git(&self) -> ExternalCommand {
        let command = ExternalCommand::new("git").env("GIT_TERMINAL_PROMPT", "0");
        match &self.credentials {
            Some(credentials) => command
                .env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env(
                    "GIT_CONFIG_VALUE_0",
                    format!("Authorization: {}", credentials.basic_auth()),
                ),
            None => command,
        }
    }

    /// `git clone --mirror <url> <path>`
    pub(crate) fn clone_command(&self, url: &str, path: &Path) -> ExternalCommand {
        self.git().args(["clone", "--mirror", url]).arg(path)
    }

    /// `git -C <path> push --mirror <url>`
    pub(crate) fn push_command(&self, path: &Path, url: &str) -> ExternalCommand {
        self.git().arg("-C").arg(path).args(["push", "--mirror", url])
    }
}

impl GitTransport for GitCli {
    fn check_available(&self) -> TransportFuture<'_> {
        Box::pin(async move {
            match ExternalCommand::new("git").arg("--version").checked().await {
                Ok(output) => {
                    println!("✓ {}", output.stdout.trim());
                    Ok(())
                }
                Err(e) => Err(OrgMoverError::new(OrgMoverErrorKind::Prerequisite)
                    .with_text(&format!(
                        "git is not installed ({e}). Install it from https://git-scm.com/"
                    ))),
            }
        })
    }

    fn clone_mirror<'a>(&'a self, url: &'a str, path: &'a Path) -> TransportFuture<'a> {
        Box::pin(async move {
            self.clone_command(url, path).checked().await?;
            Ok(())
        })
    }

    fn push_mirror<'a>(&'a self, path: &'a Path, url: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            self.push_command(path, url).checked().await?;
            Ok(())
        })
    }
}
