//! Configuration handling
use std::{
    fs::{create_dir_all, read_to_string, File},
    io::Write,
    path::PathBuf,
    time::Duration,
};

use home::home_dir;
use serde::{Deserialize, Serialize};

use crate::{
    cli::OrgMoverCli,
    errors::OrgMoverError,
    github::config::GithubConfig,
    ledger::{COMPLETED_FILE, ERROR_LOG, SUCCESS_LOG},
    migrate::{RetryPolicy, MAX_ATTEMPTS, RETRY_DELAY},
};

/// Configuration data
#[derive(Deserialize, Default, Clone, Debug)]
pub struct OrgMoverConfig {
    /// path to the configuration file
    pub config_path: PathBuf,

    /// actual configuration data
    pub config_data: ConfigData,

    /// CLI arguments
    pub cli_args: OrgMoverCli,
}

/// Content of the configuration file
#[derive(Deserialize, Serialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct ConfigData {
    /// Github configuration
    pub github: Option<GithubConfig>,

    /// Migration settings
    pub migration: Option<MigrationConfig>,
}

/// Migration settings
#[derive(Deserialize, Serialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Directory receiving the temporary clones
    pub temp_dir: Option<String>,

    /// Attempts for clone and push
    pub max_attempts: Option<u32>,

    /// Seconds between two attempts
    pub retry_delay_secs: Option<u64>,

    /// Ledger file name
    pub completed_file: Option<String>,

    /// Success log file name
    pub success_log: Option<String>,

    /// Error log file name
    pub error_log: Option<String>,
}

/// Files written by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFiles {
    /// Completed-repository ledger
    pub completed: PathBuf,

    /// Success log
    pub success_log: PathBuf,

    /// Error log
    pub error_log: PathBuf,
}

impl OrgMoverConfig {
    /// Create a new Config object from the default path
    /// # Errors
    /// Error if the config file can't be opened
    pub fn try_new(cli_args: OrgMoverCli) -> Result<Self, OrgMoverError> {
        let config_path = match cli_args.config.clone() {
            Some(p) => PathBuf::from(p),
            None => Self::get_config_path()?,
        };
        let contents = read_to_string(&config_path)
            .map_err(|e| OrgMoverError::new_with_source("Unable to open", e))?;
        let config_data = toml::from_str(&contents)?;
        Ok(OrgMoverConfig {
            config_path,
            cli_args,
            config_data,
        })
    }

    /// Save the config data to the config file
    /// # Errors
    /// Error if the config file can't be created or written to
    pub fn save(&self) -> Result<(), OrgMoverError> {
        let config_str = toml::to_string(&self.config_data)
            .map_err(|e| OrgMoverError::new_with_source("Unable to serialize config", e))?;
        let mut file = File::create(&self.config_path)
            .map_err(|e| OrgMoverError::new_with_source("Unable to create config file", e))?;
        file.write_all(config_str.as_bytes())
            .map_err(|e| OrgMoverError::new_with_source("Unable to write to config file", e))
    }

    /// Get the path to the config file
    /// # Errors
    /// Error if the home directory can't be found
    pub fn get_config_path() -> Result<PathBuf, OrgMoverError> {
        let home_dir = match home_dir() {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err("Unable to get your home dir! home::home_dir() isn't working".into()),
        };
        let config_directory = home_dir.join(".config").join(".org-mover");
        let config_path = config_directory.join("config.toml");
        create_dir_all(config_directory)
            .map_err(|e| OrgMoverError::new_with_source("Unable to create config dir", e))?;
        if !config_path.exists() {
            File::create(&config_path)
                .map_err(|e| OrgMoverError::new_with_source("Unable to create config file", e))?;
        }
        Ok(config_path)
    }

    /// Update the config data and save it to the config file
    /// # Errors
    /// Error if fail to save config
    pub fn update(
        &mut self,
        updater_fn: impl FnOnce(&mut ConfigData),
    ) -> Result<(), OrgMoverError> {
        updater_fn(&mut self.config_data);
        self.save()?;
        Ok(())
    }

    /// Migration settings, defaults when absent
    fn migration(&self) -> MigrationConfig {
        self.config_data.migration.clone().unwrap_or_default()
    }

    /// Git host of the organizations
    pub fn host(&self) -> String {
        self.config_data
            .github
            .clone()
            .unwrap_or_default()
            .host()
    }

    /// Temporary directory from the command line, then the config file
    pub fn temp_dir(&self) -> Option<PathBuf> {
        self.cli_args
            .temp_dir
            .clone()
            .or(self.migration().temp_dir)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Retry policy of clone and push
    pub fn retry_policy(&self) -> RetryPolicy {
        let migration = self.migration();
        RetryPolicy {
            max_attempts: migration.max_attempts.unwrap_or(MAX_ATTEMPTS).max(1),
            delay: migration
                .retry_delay_secs
                .map_or(RETRY_DELAY, Duration::from_secs),
        }
    }

    /// Ledger and logs, inside the state directory
    pub fn state_files(&self) -> StateFiles {
        let migration = self.migration();
        let state_dir = PathBuf::from(self.cli_args.state_dir.clone().unwrap_or_default());
        let file = |name: Option<String>, default: &str| {
            state_dir.join(name.unwrap_or_else(|| default.to_string()))
        };
        StateFiles {
            completed: file(migration.completed_file, COMPLETED_FILE),
            success_log: file(migration.success_log, SUCCESS_LOG),
            error_log: file(migration.error_log, ERROR_LOG),
        }
    }
}
