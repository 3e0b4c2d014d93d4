//! # org-mover
//!
//! Copy every repository of a GitHub organization into another organization,
//! with full history, resuming where a previous run stopped.
//!
//! ## Usage
//!
//! ```txt
//! Usage: org-mover [OPTIONS]
//!
//! Options:
//!  -s, --source <SOURCE>            The source organization [aliases: from]
//!  -d, --destination <DESTINATION>  The destination organization [aliases: to]
//!  -t, --temp-dir <TEMP_DIR>        Directory receiving the temporary clones
//!  -b, --backend <BACKEND>          How to talk to GitHub [default: gh] [possible values: gh, api]
//!      --transport <TRANSPORT>      How to run git [default: cli] [possible values: cli, libgit2]
//!      --state-dir <STATE_DIR>      Directory holding the ledger and the logs
//!  -c, --config <CONFIG>            Custom configuration file path
//!      --show-config-path           Show the current config path
//!  -v, --verbose...                 Verbose mode (-v, -vv)
//!  -h, --help                       Print help
//!  -V, --version                    Print version
//! ```
//!
//! Migrated repositories are appended to `completed_repos.txt`; running the tool
//! again skips them.

#![warn(clippy::all, rust_2018_idioms)]
#![deny(
    missing_docs,
    clippy::all,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub(crate) mod cli;
pub(crate) mod command;
pub(crate) mod config;
pub(crate) mod conflict;
pub(crate) mod display;
pub(crate) mod errors;
pub(crate) mod gh;
pub(crate) mod git;
pub(crate) mod github;
pub(crate) mod inventory;
pub(crate) mod ledger;
pub(crate) mod macros;
pub(crate) mod migrate;
pub(crate) mod platform;
pub(crate) mod utils;
pub(crate) use macros::config_password_wrap;
pub(crate) use macros::config_value;

#[cfg(test)]
mod testing;

pub use cli::{org_mover_main, OrgMoverCli};
pub use config::OrgMoverConfig;
pub use errors::{OrgMoverError, OrgMoverErrorKind};
pub use utils::main_migrate;
