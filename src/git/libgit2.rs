//! Git transport backed by libgit2
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use git2::{build::RepoBuilder, Cred, CredentialType, FetchOptions, PushOptions, RemoteCallbacks};

use super::{GitCredentials, GitTransport, TransportFuture};
use crate::errors::{OrgMoverError, OrgMoverErrorKind};

/// Refspec fetching every ref as-is, like `git clone --mirror`
const MIRROR_REFSPEC: &str = "+refs/*:refs/*";

/// Transport using the bundled libgit2, no `git` binary needed
#[derive(Debug, Clone, Default)]
pub struct Libgit2Transport {
    /// Credentials for HTTPS remotes, the ssh agent is used otherwise
    credentials: Option<GitCredentials>,
}

impl Libgit2Transport {
    /// Create a new libgit2 transport
    pub(crate) fn new(credentials: Option<GitCredentials>) -> Self {
        Self { credentials }
    }
}

/// Where the credentials of a request come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialChoice<'a> {
    /// The configured token
    Token(&'a GitCredentials),

    /// The git credential helper, set up by `gh auth setup-git`
    Helper,

    /// The ssh agent
    SshAgent,

    /// Default credentials of the platform (NTLM, Negotiate)
    Default,
}

/// Pick a credential source among the types libgit2 accepts
fn choose_credential(
    credentials: Option<&GitCredentials>,
    allowed: CredentialType,
) -> Option<CredentialChoice<'_>> {
    if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
        return Some(match credentials {
            Some(c) => CredentialChoice::Token(c),
            None => CredentialChoice::Helper,
        });
    }
    if allowed.contains(CredentialType::SSH_KEY) {
        return Some(CredentialChoice::SshAgent);
    }
    if allowed.contains(CredentialType::DEFAULT) {
        return Some(CredentialChoice::Default);
    }
    None
}

/// Remote callbacks answering credential requests once
fn remote_callbacks<'a>(
    credentials: Option<&'a GitCredentials>,
    tried: &'a Cell<bool>,
) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        // libgit2 asks again after a rejection, stop instead of looping
        if tried.replace(true) {
            return Err(git2::Error::from_str("authentication failed"));
        }
        match choose_credential(credentials, allowed) {
            Some(CredentialChoice::Token(c)) => Cred::userpass_plaintext(&c.username, &c.token),
            Some(CredentialChoice::Helper) => {
                Cred::credential_helper(&git2::Config::open_default()?, url, username_from_url)
            }
            Some(CredentialChoice::SshAgent) => {
                Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
            }
            Some(CredentialChoice::Default) => Cred::default(),
            None => Err(git2::Error::from_str(&format!(
                "no credentials for {url} (accepted: {allowed:?})"
            ))),
        }
    });
    callbacks
}

/// Clone a bare mirror of `url` into `path`
fn clone_mirror_blocking(
    url: &str,
    path: &Path,
    credentials: Option<&GitCredentials>,
) -> Result<(), OrgMoverError> {
    let tried = Cell::new(false);
    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(remote_callbacks(credentials, &tried));
    let mut builder = RepoBuilder::new();
    builder
        .bare(true)
        .remote_create(|repo, name, url| repo.remote_with_fetch(name, url, MIRROR_REFSPEC))
        .fetch_options(fetch_opts);
    builder.clone(url, path)?;
    Ok(())
}

/// Push every direct ref of the bare repository at `path` to `url`
fn push_mirror_blocking(
    path: &Path,
    url: &str,
    credentials: Option<&GitCredentials>,
) -> Result<(), OrgMoverError> {
    let repo = git2::Repository::open_bare(path)?;
    let mut refspecs = vec![];
    for reference in repo.references()? {
        let reference = reference?;
        if reference.kind() != Some(git2::ReferenceType::Direct) {
            continue;
        }
        if let Some(name) = reference.name() {
            refspecs.push(format!("+{name}:{name}"));
        }
    }
    log::debug!("Pushing {} refs to {url}", refspecs.len());

    let rejected = RefCell::new(vec![]);
    let tried = Cell::new(false);
    let mut callbacks = remote_callbacks(credentials, &tried);
    callbacks.push_update_reference(|refname, status| {
        if let Some(message) = status {
            rejected.borrow_mut().push(format!("{refname}: {message}"));
        }
        Ok(())
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);
    let mut remote = repo.remote_anonymous(url)?;
    remote.push(&refspecs, Some(&mut opts))?;
    drop(opts);

    let rejected = rejected.into_inner();
    if !rejected.is_empty() {
        return Err(OrgMoverError::new(OrgMoverErrorKind::Git2)
            .with_text(&format!("Rejected refs: {}", rejected.join(", "))));
    }
    Ok(())
}

/// Run a libgit2 job off the async runtime
async fn run_blocking<F>(job: F) -> Result<(), OrgMoverError>
where
    F: FnOnce() -> Result<(), OrgMoverError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| OrgMoverError::new_with_source("libgit2 task failed", e))?
}

impl GitTransport for Libgit2Transport {
    fn check_available(&self) -> TransportFuture<'_> {
        Box::pin(async move {
            let version = git2::Version::get();
            let (major, minor, rev) = version.libgit2_version();
            println!("✓ libgit2 {major}.{minor}.{rev}");
            if !version.https() {
                return Err(OrgMoverError::new(OrgMoverErrorKind::Prerequisite)
                    .with_text("libgit2 was built without HTTPS support"));
            }
            Ok(())
        })
    }

    fn clone_mirror<'a>(&'a self, url: &'a str, path: &'a Path) -> TransportFuture<'a> {
        let url = url.to_string();
        let path: PathBuf = path.to_path_buf();
        let credentials = self.credentials.clone();
        Box::pin(async move {
            run_blocking(move || clone_mirror_blocking(&url, &path, credentials.as_ref())).await
        })
    }

    fn push_mirror<'a>(&'a self, path: &'a Path, url: &'a str) -> TransportFuture<'a> {
        let url = url.to_string();
        let path: PathBuf = path.to_path_buf();
        let credentials = self.credentials.clone();
        Box::pin(async move {
            run_blocking(move || push_mirror_blocking(&path, &url, credentials.as_ref())).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a repository with a branch and a tag
    fn init_repo(path: &Path) -> git2::Oid {
        let repo = git2::Repository::init(path).unwrap();
        let signature = git2::Signature::now("t", "t@t").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, "init", &tree, &[])
            .unwrap();
        let commit = repo.find_commit(oid).unwrap();
        repo.branch("feature", &commit, false).unwrap();
        repo.tag_lightweight("v1", commit.as_object(), false)
            .unwrap();
        oid
    }

    #[test]
    fn https_without_token_uses_credential_helper() {
        assert_eq!(
            choose_credential(None, CredentialType::USER_PASS_PLAINTEXT),
            Some(CredentialChoice::Helper)
        );
    }

    #[test]
    fn https_with_token_uses_token() {
        let token = GitCredentials::from_token("ghp_secret");
        assert_eq!(
            choose_credential(Some(&token), CredentialType::USER_PASS_PLAINTEXT),
            Some(CredentialChoice::Token(&token))
        );
    }

    #[test]
    fn ssh_agent_only_when_ssh_keys_are_accepted() {
        let token = GitCredentials::from_token("ghp_secret");
        assert_eq!(
            choose_credential(Some(&token), CredentialType::SSH_KEY),
            Some(CredentialChoice::SshAgent)
        );
        assert_eq!(
            choose_credential(None, CredentialType::SSH_KEY | CredentialType::USERNAME),
            Some(CredentialChoice::SshAgent)
        );
        assert_ne!(
            choose_credential(None, CredentialType::USER_PASS_PLAINTEXT),
            Some(CredentialChoice::SshAgent)
        );
    }

    #[test]
    fn unsupported_types_get_nothing() {
        assert_eq!(
            choose_credential(None, CredentialType::DEFAULT),
            Some(CredentialChoice::Default)
        );
        assert_eq!(choose_credential(None, CredentialType::USERNAME), None);
    }

    #[tokio::test]
    async fn mirror_round_trip_between_local_remotes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let oid = init_repo(&source);
        let dest = dir.path().join("dest.git");
        git2::Repository::init_bare(&dest).unwrap();

        let transport = Libgit2Transport::default();
        let mirror = dir.path().join("mirror.git");
        let source_url = source.to_str().unwrap().to_string();
        transport.clone_mirror(&source_url, &mirror).await.unwrap();
        let dest_url = dest.to_str().unwrap().to_string();
        transport.push_mirror(&mirror, &dest_url).await.unwrap();

        let pushed = git2::Repository::open_bare(&dest).unwrap();
        for name in ["refs/heads/feature", "refs/tags/v1"] {
            let target = pushed.find_reference(name).unwrap().target().unwrap();
            assert_eq!(target, oid);
        }
    }

    #[tokio::test]
    async fn clone_of_missing_remote_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing-here");
        let transport = Libgit2Transport::default();
        let err = transport
            .clone_mirror(missing.to_str().unwrap(), &dir.path().join("mirror.git"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &OrgMoverErrorKind::Git2);
    }
}
