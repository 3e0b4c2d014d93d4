//! Inventory tables
use std::fmt::Write as _;

use crate::inventory::sort_by_creation;
use crate::utils::Repo;

/// Width of the table rules
const TABLE_WIDTH: usize = 100;

/// Longest name printed before truncation
const NAME_WIDTH: usize = 39;

/// Format a size in KB
pub fn format_size(kb: u64) -> String {
    const KB_PER_MB: u64 = 1024;
    const KB_PER_GB: u64 = 1024 * 1024;
    if kb < KB_PER_MB {
        format!("{kb} KB")
    } else if kb < KB_PER_GB {
        format!("{:.1} MB", kb as f64 / KB_PER_MB as f64)
    } else {
        format!("{:.1} GB", kb as f64 / KB_PER_GB as f64)
    }
}

/// Render the inventory of an organization, oldest repository first
pub fn render_repo_table(repos: &[Repo], org: &str) -> String {
    let rule = "=".repeat(TABLE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}\nRepositories in {org}\n{rule}");
    if repos.is_empty() {
        out.push_str("No repositories found.\n");
        return out;
    }

    let mut sorted = repos.to_vec();
    sort_by_creation(&mut sorted);
    let _ = writeln!(
        out,
        "{:<4} {:<40} {:<12} {:<8} {:<6} {:<20}",
        "#", "Name", "Size", "Private", "LFS", "Created"
    );
    let _ = writeln!(out, "{}", "-".repeat(TABLE_WIDTH));
    for (idx, repo) in sorted.iter().enumerate() {
        let name: String = repo.name.chars().take(NAME_WIDTH).collect();
        let private = if repo.private { "Yes" } else { "No" };
        let lfs = if repo.uses_lfs { "⚠ YES" } else { "No" };
        let _ = writeln!(
            out,
            "{:<4} {:<40} {:<12} {:<8} {:<6} {:<20}",
            idx + 1,
            name,
            format_size(repo.disk_usage),
            private,
            lfs,
            repo.created_at.format("%Y-%m-%d").to_string()
        );
    }
    let total_size: u64 = sorted.iter().map(|repo| repo.disk_usage).sum();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total: {} repositories", sorted.len());
    let _ = writeln!(out, "Total size: {}", format_size(total_size));

    let lfs_repos: Vec<&Repo> = sorted.iter().filter(|repo| repo.uses_lfs).collect();
    if !lfs_repos.is_empty() {
        out.push_str("\n⚠ WARNING: The following repositories use Git LFS:\n");
        for repo in lfs_repos {
            let _ = writeln!(out, "  - {}", repo.name);
        }
        out.push_str("\nGit LFS repositories require special handling:\n");
        out.push_str("  1. You must have Git LFS installed (git lfs install)\n");
        out.push_str("  2. LFS files may not transfer correctly with --mirror\n");
        out.push_str("  3. You may need to manually configure LFS in the new org\n");
    }
    out
}

/// Print the inventory of an organization
pub fn display_repo_table(repos: &[Repo], org: &str) {
    println!("{}", render_repo_table(repos, org));
}
