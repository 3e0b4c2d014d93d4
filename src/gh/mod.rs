//! GitHub through the `gh` command line client
pub(crate) mod platform;
pub(crate) mod repo;

/// Maximum number of repositories listed per organization
const REPO_LIST_LIMIT: &str = "1000";

/// Fields requested from `gh repo list`
const REPO_LIST_FIELDS: &str = "name,createdAt,isPrivate,description,diskUsage";
