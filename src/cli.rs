//! Command line options for the org-mover tool
use crate::{
    config::OrgMoverConfig, errors::OrgMoverError, git::TransportType, platform::PlatformType,
    utils::main_migrate,
};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// org-mover - Copy every repository of a GitHub organization into another one
#[derive(Parser, Deserialize, Default, Clone, Debug)]
#[serde(default)]
#[command(version)]
pub struct OrgMoverCli {
    /// The source organization
    #[arg(short, long, visible_alias = "from")]
    pub source: Option<String>,

    /// The destination organization
    #[arg(short, long, visible_alias = "to")]
    pub destination: Option<String>,

    /// Directory receiving the temporary clones
    #[arg(short, long)]
    pub temp_dir: Option<String>,

    /// How to talk to GitHub
    #[arg(short, long, value_enum, default_value_t)]
    pub backend: PlatformType,

    /// How to run git
    #[arg(long, value_enum, default_value_t)]
    pub transport: TransportType,

    /// Directory holding the ledger and the logs
    #[arg(long)]
    pub state_dir: Option<String>,

    /// Custom configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Show the current config path
    #[arg(long)]
    pub show_config_path: bool,

    /// Verbose mode (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl OrgMoverCli {
    /// Log level matching the verbosity
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Message printed when the run is interrupted
fn interrupt_message(ledger: &Path) -> String {
    format!(
        "\n\nInterrupted by user. Progress saved in {}\nRun again to resume.",
        ledger.display()
    )
}

/// Exit cleanly on Ctrl+C, the ledger already holding every finished repository
fn handle_interrupt(ledger: PathBuf) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("{}", interrupt_message(&ledger));
            std::process::exit(0);
        }
    });
}

/// Run the org-mover tool with the provided command line options
/// # Errors
/// Error if the configuration can't be loaded or the migration stops
pub async fn org_mover_main(args: OrgMoverCli) -> Result<(), OrgMoverError> {
    let config = OrgMoverConfig::try_new(args)?;
    if config.cli_args.show_config_path {
        println!("{}", config.config_path.display());
        return Ok(());
    }
    handle_interrupt(config.state_files().completed);
    main_migrate(config).await
}
