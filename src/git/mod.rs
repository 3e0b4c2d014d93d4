//! Git transfers: mirror clone and mirror push
use std::{future::Future, path::Path, pin::Pin};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::OrgMoverError;

pub(crate) mod cli;
pub(crate) mod libgit2;

/// Future returned by every [`GitTransport`] operation
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), OrgMoverError>> + Send + 'a>>;

/// Move the full history of a repository between remotes
pub trait GitTransport: Sync + Send {
    /// Verify the transport can be used
    fn check_available(&self) -> TransportFuture<'_>;

    /// Clone every ref of `url` into a bare repository at `path`
    fn clone_mirror<'a>(&'a self, url: &'a str, path: &'a Path) -> TransportFuture<'a>;

    /// Push every ref of the bare repository at `path` to `url`
    fn push_mirror<'a>(&'a self, path: &'a Path, url: &'a str) -> TransportFuture<'a>;
}

/// Available git transports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// The `git` binary
    #[default]
    Cli,

    /// The bundled libgit2
    Libgit2,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::Cli => write!(f, "cli"),
            TransportType::Libgit2 => write!(f, "libgit2"),
        }
    }
}

/// HTTPS credentials for git remotes
#[derive(Clone, PartialEq, Eq)]
pub struct GitCredentials {
    /// User name sent to the remote
    pub username: String,

    /// Token used as password
    pub token: String,
}

impl GitCredentials {
    /// Credentials for a GitHub token
    pub fn from_token(token: &str) -> Self {
        Self {
            username: "x-access-token".to_string(),
            token: token.to_string(),
        }
    }

    /// Value of a basic `Authorization` header
    pub(crate) fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.username, self.token);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl std::fmt::Debug for GitCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCredentials")
            .field("username", &self.username)
            .field("token", &"***")
            .finish()
    }
}
