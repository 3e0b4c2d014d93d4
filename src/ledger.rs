//! Completed-repository ledger and run logs
//!
//! Both are plain text files that are only ever appended to. The ledger holds one
//! repository name per line; a later run loads it and skips every name it contains.
use std::collections::HashSet;
use std::fs::{read_to_string, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::errors::{OrgMoverError, OrgMoverErrorKind};

/// Default ledger file name
pub const COMPLETED_FILE: &str = "completed_repos.txt";

/// Default success log file name
pub const SUCCESS_LOG: &str = "migration_log.txt";

/// Default error log file name
pub const ERROR_LOG: &str = "migration_errors.txt";

/// Durable record of the repositories already migrated
pub trait Ledger {
    /// Whether the repository was already migrated
    fn contains(&self, name: &str) -> bool;

    /// Record the repository as migrated
    /// # Errors
    /// Error if the record can't be persisted
    fn mark_complete(&mut self, name: &str) -> Result<(), OrgMoverError>;
}

/// Ledger stored in a text file, one name per line
#[derive(Debug, Clone)]
pub struct FileLedger {
    /// Path of the ledger file
    path: PathBuf,

    /// Names already recorded
    completed: HashSet<String>,
}

impl FileLedger {
    /// Load the ledger, a missing file being an empty ledger
    /// # Errors
    /// Error if the file exists but can't be read
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OrgMoverError> {
        let path = path.as_ref().to_path_buf();
        let completed: HashSet<String> = match read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(OrgMoverError::new(OrgMoverErrorKind::Ledger)
                    .with_text(&format!("Unable to read {}: {e}", path.display())))
            }
        };
        log::debug!("Loaded {} entries from {}", completed.len(), path.display());
        Ok(Self { path, completed })
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of recorded repositories
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

impl Ledger for FileLedger {
    fn contains(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    fn mark_complete(&mut self, name: &str) -> Result<(), OrgMoverError> {
        if self.completed.contains(name) {
            return Ok(());
        }
        append_line(&self.path, name).map_err(|e| {
            OrgMoverError::new(OrgMoverErrorKind::Ledger)
                .with_text(&format!("Unable to write {}: {e}", self.path.display()))
        })?;
        self.completed.insert(name.to_string());
        Ok(())
    }
}

/// Append one line to a file and flush it to disk
fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format!("{line}\n").as_bytes())?;
    file.sync_data()
}

/// Timestamped log file
#[derive(Debug, Clone)]
pub struct RunLog {
    /// Path of the log file
    path: PathBuf,
}

impl RunLog {
    /// Create a log writing to `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `[timestamp] message` to the log
    /// # Errors
    /// Error if the log can't be written
    pub fn append(&self, message: &str) -> Result<(), OrgMoverError> {
        append_line(&self.path, &format_entry(Local::now(), message))?;
        Ok(())
    }
}

/// Format one log line
pub(crate) fn format_entry(timestamp: DateTime<Local>, message: &str) -> String {
    format!("[{}] {message}", timestamp.format("%Y-%m-%d %H:%M:%S"))
}

/// In-memory ledger
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryLedger {
    /// Names in insertion order, duplicates included
    pub(crate) entries: Vec<String>,
}

#[cfg(test)]
impl Ledger for MemoryLedger {
    fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry == name)
    }

    fn mark_complete(&mut self, name: &str) -> Result<(), OrgMoverError> {
        self.entries.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::load(dir.path().join(COMPLETED_FILE)).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("anything"));
    }

    #[test]
    fn load_trims_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COMPLETED_FILE);
        fs::write(&path, "alpha\n\n  beta \r\nalpha\n").unwrap();
        let ledger = FileLedger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains("alpha"));
        assert!(ledger.contains("beta"));
        assert!(!ledger.contains("Alpha"));
    }

    #[test]
    fn mark_complete_appends_once_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COMPLETED_FILE);
        fs::write(&path, "old\n").unwrap();

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.mark_complete("new").unwrap();
        ledger.mark_complete("new").unwrap();
        ledger.mark_complete("old").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");

        let reloaded = FileLedger::load(&path).unwrap();
        assert!(reloaded.contains("old"));
        assert!(reloaded.contains("new"));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn unwritable_ledger_reports_ledger_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory can't be opened for appending
        let mut ledger = FileLedger {
            path: dir.path().to_path_buf(),
            completed: HashSet::new(),
        };
        let err = ledger.mark_complete("repo").unwrap_err();
        assert_eq!(err.kind(), &OrgMoverErrorKind::Ledger);
        assert!(!ledger.contains("repo"));
    }

    #[test]
    fn log_entries_are_timestamped() {
        let timestamp = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            format_entry(timestamp, "✓ tool complete (took 1.2s)"),
            "[2024-03-09 07:05:01] ✓ tool complete (took 1.2s)"
        );
    }

    #[test]
    fn run_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join(ERROR_LOG));
        log.append("first").unwrap();
        log.append("second").unwrap();
        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('[') && lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] second"));
    }
}
