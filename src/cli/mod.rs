//! Command-line interface for mpdeps.
//!
//! # Available Commands
//!
//! - `build` - Resolve the components and filters of every unit in a project
//!   and emit markup and filter modules
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//! - `--config` - Path to the project configuration (also `MPDEPS_CONFIG`)
//!
//! # Example
//!
//! ```bash
//! # Build the project in the current directory
//! mpdeps build
//!
//! # Build another project and print the summary as JSON
//! mpdeps build --project ../shop --json
//! ```

mod build;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::CONFIG_ENV_VAR;

pub use build::BuildCommand;

/// Settings derived from the global options before a command runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive, `None` when logging is off
    pub log_level: Option<String>,

    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Whether command output other than errors is suppressed.
    pub const fn is_quiet(&self) -> bool {
        self.log_level.is_none()
    }
}

/// Command-line arguments of `mpdeps`.
#[derive(Parser, Debug)]
#[command(
    name = "mpdeps",
    about = "Incremental component and filter resolution for mini-program builds",
    version,
    author,
    long_about = "mpdeps resolves which components and filter functions every unit of a \
                  mini-program project depends on, keeps the global component registry \
                  consistent, and emits the resulting markup and filter modules."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to mpdeps.toml
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve dependencies and emit markup for a project
    Build(BuildCommand),
}

impl Cli {
    /// Run the parsed command with settings from the global options.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Derive [`CliConfig`] from the global options.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Run the parsed command with explicit settings.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Build(cmd) => cmd.execute(&config).await,
        }
    }
}
