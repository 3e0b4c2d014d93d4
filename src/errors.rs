//! Error handling for the org-mover crate.
use std::{error::Error as StdError, fmt};

/// Error type for the org-mover crate.
#[derive(Debug)]
pub struct OrgMoverError {
    /// Inner error.
    inner: Box<Inner>,
}

impl OrgMoverError {
    /// Create a new error.
    pub(crate) fn new(kind: OrgMoverErrorKind) -> Self {
        Self {
            inner: Box::new(Inner {
                kind,
                source: None,
                org: None,
            }),
        }
    }

    /// Create a new custom error wrapping a source error.
    pub(crate) fn new_with_source<E>(text: &str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source: BoxError = source.into();
        Self::new(OrgMoverErrorKind::Custom).with_text(&format!("{text}: {source}"))
    }

    /// Attach a text source to the error.
    pub(crate) fn with_text(mut self, text: &str) -> Self {
        self.inner.source = Some(Box::new(std::io::Error::other(text.to_string())));
        self
    }

    /// Attach the organization the error is about.
    pub(crate) fn with_org(mut self, org: &str) -> Self {
        self.inner.org = Some(org.to_string());
        self
    }

    /// Kind of the error
    pub fn kind(&self) -> &OrgMoverErrorKind {
        &self.inner.kind
    }

    /// Organization the error is about, if any
    pub fn org(&self) -> Option<&str> {
        self.inner.org.as_deref()
    }
}

/// Type alias for a boxed error.
pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Inner error type for the org-mover crate.
#[derive(Debug)]
struct Inner {
    /// Error kind.
    kind: OrgMoverErrorKind,

    /// Organization concerned by the error
    org: Option<String>,

    /// Source error.
    source: Option<BoxError>,
}

/// Kinds of errors raised by org-mover
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgMoverErrorKind {
    /// Free-form error.
    Custom,

    /// An external command exited with a non-zero status.
    Command,

    /// A required tool is missing or not authenticated.
    Prerequisite,

    /// The organization can't be accessed.
    OrgAccess,

    /// Error related to the reqwest crate.
    Reqwest,

    /// Error related to serde.
    Serde,

    /// Error related to Git2.
    Git2,

    /// Error related to the filesystem.
    Io,

    /// Error related to the configuration file.
    Config,

    /// Error related to the GetAllRepos func.
    GetAllRepos,

    /// Error related to the GetFileContent func.
    GetFile,

    /// Error related to the ListBranches func.
    GetBranches,

    /// Error related to the GetBranchHead func.
    GetBranchHead,

    /// Error related to the RepoCreation func.
    RepoCreation,

    /// Repositories with the same name but different content exist on both sides.
    Conflict,

    /// Error related to the completed-repository ledger.
    Ledger,
}

impl fmt::Display for OrgMoverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.inner.kind)?;
        if let Some(org) = &self.inner.org {
            write!(f, " ({org})")?;
        }
        if let Some(source) = &self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for OrgMoverError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

/// Build an error of the given kind from a source error.
fn from_source<E: Into<BoxError>>(kind: OrgMoverErrorKind, e: E) -> OrgMoverError {
    OrgMoverError {
        inner: Box::new(Inner {
            kind,
            source: Some(e.into()),
            org: None,
        }),
    }
}

impl From<reqwest::Error> for OrgMoverError {
    fn from(e: reqwest::Error) -> Self {
        from_source(OrgMoverErrorKind::Reqwest, e)
    }
}

impl From<serde_json::Error> for OrgMoverError {
    fn from(e: serde_json::Error) -> Self {
        from_source(OrgMoverErrorKind::Serde, e)
    }
}

impl From<std::io::Error> for OrgMoverError {
    fn from(e: std::io::Error) -> Self {
        from_source(OrgMoverErrorKind::Io, e)
    }
}

impl From<git2::Error> for OrgMoverError {
    fn from(e: git2::Error) -> Self {
        from_source(OrgMoverErrorKind::Git2, e)
    }
}

impl From<toml::de::Error> for OrgMoverError {
    fn from(e: toml::de::Error) -> Self {
        from_source(OrgMoverErrorKind::Config, e)
    }
}

impl From<toml::ser::Error> for OrgMoverError {
    fn from(e: toml::ser::Error) -> Self {
        from_source(OrgMoverErrorKind::Config, e)
    }
}

impl From<&str> for OrgMoverError {
    fn from(text: &str) -> Self {
        Self::new(OrgMoverErrorKind::Custom).with_text(text)
    }
}

impl From<String> for OrgMoverError {
    fn from(text: String) -> Self {
        Self::new(OrgMoverErrorKind::Custom).with_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_org_and_source() {
        let err = OrgMoverError::new(OrgMoverErrorKind::OrgAccess)
            .with_org("acme")
            .with_text("HTTP 404");
        assert_eq!(err.to_string(), "OrgAccess (acme): HTTP 404");
        assert_eq!(err.kind(), &OrgMoverErrorKind::OrgAccess);
        assert_eq!(err.org(), Some("acme"));
    }

    #[test]
    fn string_conversion_is_custom() {
        let err: OrgMoverError = "Source and destination can't be the same".into();
        assert_eq!(err.kind(), &OrgMoverErrorKind::Custom);
        assert!(err.to_string().contains("can't be the same"));
        assert!(err.source().is_some());
    }

    #[test]
    fn io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: OrgMoverError = io.into();
        assert_eq!(err.kind(), &OrgMoverErrorKind::Io);
        assert_eq!(err.to_string(), "Io: gone");
    }
}
