//! Utility functions
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::OrgMoverConfig;
use crate::conflict::{Classification, ConflictResolution};
use crate::display::display_repo_table;
use crate::errors::{OrgMoverError, OrgMoverErrorKind};
use crate::gh::platform::GhPlatform;
use crate::git::{cli::GitCli, libgit2::Libgit2Transport, GitTransport, TransportType};
use crate::github::config::GithubConfig;
use crate::ledger::{FileLedger, RunLog};
use crate::migrate::{prepare_migration, MigrationLogs, Migrator};
use crate::platform::{Platform, PlatformType};

/// Repository information
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Hash, Clone)]
pub struct Repo {
    /// Name of the repository
    pub name: String,

    /// Creation time of the repository
    pub created_at: DateTime<Utc>,

    /// Whether the repository is private
    pub private: bool,

    /// Description of the repository
    pub description: Option<String>,

    /// Size of the repository in KB
    pub disk_usage: u64,

    /// Whether the repository stores files with Git LFS (best effort)
    pub uses_lfs: bool,
}

/// Decode a base64 file content as returned by the GitHub contents API
///
/// GitHub wraps the encoded content every 60 characters, so whitespace is ignored.
/// Invalid UTF-8 sequences are replaced.
/// # Errors
/// Error if the content isn't valid base64
pub(crate) fn decode_base64_content(encoded: &str) -> Result<String, OrgMoverError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| OrgMoverError::new_with_source("Invalid base64 content", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Expand a leading `~` to the home directory
pub(crate) fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => match home::home_dir() {
            Some(home) if !home.as_os_str().is_empty() => home.join(rest),
            _ => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Get input from the user
pub(crate) fn input() -> Result<String, OrgMoverError> {
    use std::io::{stdin, stdout, Write};
    let mut s = String::new();
    let _ = stdout().flush();
    stdin()
        .read_line(&mut s)
        .map_err(|e| OrgMoverError::new_with_source("Did not enter a correct string", e))?;
    if let Some('\n') = s.chars().next_back() {
        s.pop();
    }
    if let Some('\r') = s.chars().next_back() {
        s.pop();
    }
    Ok(s)
}

/// Ask a question on the same line and return the trimmed answer
pub(crate) fn prompt<S: AsRef<str>>(msg: S) -> Result<String, OrgMoverError> {
    print!("{}", msg.as_ref());
    Ok(input()?.trim().to_string())
}

/// Get password from the user
pub(crate) fn get_password() -> Result<String, OrgMoverError> {
    rpassword::read_password()
        .map_err(|e| OrgMoverError::new_with_source("Error reading password", e))
}

/// Build the hosting backend chosen on the command line
pub(crate) fn get_platform(
    config: &mut OrgMoverConfig,
) -> Result<Box<dyn Platform>, OrgMoverError> {
    let platform: Box<dyn Platform> = match config.cli_args.backend {
        PlatformType::Gh => Box::new(GhPlatform::new(config.host())),
        PlatformType::Api => Box::new(GithubConfig::get_platform(config)?),
    };
    Ok(platform)
}

/// Build the git transport chosen on the command line
pub(crate) fn get_transport(
    config: &mut OrgMoverConfig,
) -> Result<Box<dyn GitTransport>, OrgMoverError> {
    // gh backed runs rely on `gh auth setup-git` for credentials
    let credentials = match config.cli_args.backend {
        PlatformType::Gh => None,
        PlatformType::Api => Some(GithubConfig::get_credentials(config)?),
    };
    let transport: Box<dyn GitTransport> = match config.cli_args.transport {
        TransportType::Cli => Box::new(GitCli::new(credentials)),
        TransportType::Libgit2 => Box::new(Libgit2Transport::new(credentials)),
    };
    Ok(transport)
}

/// Backend and transport of a run, for the logs
fn backend_summary(platform: &dyn Platform, transport: TransportType) -> String {
    format!("{} backend, {transport} transport", platform.get_type())
}

/// Print a banner line
fn banner(title: &str) {
    println!("{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print the outcome of the duplicate verification
fn report_conflicts(resolutions: &[ConflictResolution]) {
    if resolutions.is_empty() {
        println!("✓ No conflicts!");
        return;
    }
    println!();
    banner("Matching repository names found. Verifying if duplicates...");
    for resolution in resolutions {
        match resolution.classification {
            Classification::VerifiedDuplicate => {
                println!("Checking: {}... ✓ Verified duplicate", resolution.repo_name)
            }
            Classification::DivergentConflict => println!(
                "Checking: {}... ✗ Different ({})",
                resolution.repo_name, resolution.reason
            ),
        }
    }
    println!();
}

/// Get the temporary directory, creating it when missing
fn get_temp_dir(config: &OrgMoverConfig) -> Result<PathBuf, OrgMoverError> {
    let raw = match config.temp_dir() {
        Some(dir) => dir,
        None => PathBuf::from(prompt("Temporary directory path (for cloning): ")?),
    };
    let temp_dir = expand_tilde(raw);
    if !temp_dir.exists() {
        println!("\nCreating directory: {}", temp_dir.display());
        std::fs::create_dir_all(&temp_dir)?;
    }
    if !temp_dir.is_dir() {
        return Err(format!("{} is not a directory", temp_dir.display()).into());
    }
    Ok(temp_dir)
}

/// Main function to migrate an organization
/// # Errors
/// Error if a prerequisite is missing, an organization can't be read or a naming conflict is found
pub async fn main_migrate(config: OrgMoverConfig) -> Result<(), OrgMoverError> {
    let mut config = config;
    banner("GitHub Organization Repository Migration");
    println!();

    let platform = get_platform(&mut config)?;
    let transport = get_transport(&mut config)?;
    log::debug!(
        "Using {}",
        backend_summary(platform.as_ref(), config.cli_args.transport)
    );
    platform.check_prerequisites().await?;
    transport.check_available().await?;
    println!();

    let source_org = match config.cli_args.source.clone() {
        Some(org) => org,
        None => prompt("Source organization name: ")?,
    };
    let dest_org = match config.cli_args.destination.clone() {
        Some(org) => org,
        None => prompt("Destination organization name: ")?,
    };
    if source_org.is_empty() || dest_org.is_empty() {
        return Err("Organization names can't be empty".into());
    }
    if source_org.eq_ignore_ascii_case(&dest_org) {
        return Err("Source and destination can't be the same".into());
    }
    println!();

    println!("Verifying organization access...");
    for org in [&source_org, &dest_org] {
        platform.check_access(org).await?;
        println!("✓ Admin rights confirmed for {org}");
    }
    println!();

    let paths = config.state_files();
    let mut ledger = FileLedger::load(&paths.completed)?;

    println!("Detecting repos in both orgs...");
    let plan = prepare_migration(platform.as_ref(), &source_org, &dest_org, &mut ledger).await;
    let plan = match plan {
        Ok(plan) => plan,
        Err(e) if e.kind() == &OrgMoverErrorKind::Conflict => {
            println!("ERROR: Non-duplicate repositories with matching names found.");
            println!("This tool is intended ONLY to copy one whole github org");
            println!("into one raw empty org, and it is not built to deal with conflicts.");
            return Err(e);
        }
        Err(e) => return Err(e),
    };
    report_conflicts(&plan.resolutions);
    if plan.duplicates() > 0 {
        println!(
            "✓ All {} matching repos are verified duplicates",
            plan.duplicates()
        );
        println!("These will be skipped during migration.");
        println!();
    }

    display_repo_table(&plan.source_repos, &source_org);
    display_repo_table(&plan.dest_repos, &dest_org);

    println!();
    banner("Review the repository information above.");
    prompt("Press ENTER to continue to migration setup...")?;
    println!();

    let temp_dir = get_temp_dir(&config)?;
    println!();

    if !ledger.is_empty() {
        println!("{} repos already completed", ledger.len());
        println!("{} repos remaining", plan.remaining.len());
    } else {
        println!(
            "Ready to copy {} repos from {source_org} to {dest_org}",
            plan.remaining.len()
        );
    }
    println!();

    if prompt("Type \"YES\" to continue: ")? != "YES" {
        println!("Aborted.");
        return Ok(());
    }
    println!();
    banner("Starting migration...");
    println!();

    let logs = MigrationLogs {
        success: RunLog::new(&paths.success_log),
        errors: RunLog::new(&paths.error_log),
    };
    let migrator = Migrator::new(
        platform.as_ref(),
        transport.as_ref(),
        &source_org,
        &dest_org,
        &temp_dir,
        logs,
    )
    .with_retry(config.retry_policy());
    let summary = migrator.migrate_all(&plan.remaining, &mut ledger).await;

    banner("Migration Complete");
    println!("Total processed: {}", summary.attempted);
    println!("Successful: {}", summary.succeeded);
    println!("Failed: {}", summary.failed);
    if summary.failed > 0 {
        println!("\nSee {} for error details", paths.error_log.display());
    }
    println!("\nCompleted repos logged in: {}", ledger.path().display());
    println!("Success log: {}", paths.success_log.display());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_wrapped_content() {
        // "*.psd filter=lfs diff=lfs merge=lfs -text\n" split like the GitHub API does
        let encoded = "Ki5wc2QgZmlsdGVyPWxmcyBkaWZmPWxmcyBtZXJnZT1sZnMg\nLXRleHQK\n";
        let decoded = decode_base64_content(encoded).unwrap();
        assert_eq!(decoded, "*.psd filter=lfs diff=lfs merge=lfs -text\n");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_base64_content("not base64 !!").is_err());
    }

    #[test]
    fn expand_tilde_only_touches_leading_tilde() {
        assert_eq!(expand_tilde("/tmp/clones"), PathBuf::from("/tmp/clones"));
        assert_eq!(expand_tilde("clones/~"), PathBuf::from("clones/~"));
        if let Some(home) = home::home_dir() {
            assert_eq!(expand_tilde("~/clones"), home.join("clones"));
        }
    }

    #[test]
    fn backend_summary_names_both_choices() {
        let platform = crate::testing::MockPlatform::default();
        assert_eq!(
            backend_summary(&platform, TransportType::Libgit2),
            "api backend, libgit2 transport"
        );
        assert_eq!(
            backend_summary(&GhPlatform::default(), TransportType::Cli),
            "gh backend, cli transport"
        );
    }

    #[test]
    fn compare_repo() {
        let created_at = "2020-01-01T00:00:00Z".parse().unwrap();
        let repo1 = Repo {
            name: "test".to_string(),
            created_at,
            private: false,
            description: None,
            disk_usage: 10,
            uses_lfs: false,
        };
        let repo2 = repo1.clone();
        let repo3 = Repo {
            private: true,
            ..repo1.clone()
        };
        assert_eq!(repo1, repo2);
        assert_ne!(repo1, repo3);
    }
}
