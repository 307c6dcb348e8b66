//! mpdeps CLI entry point
//!
//! Parses arguments, sets up logging, runs the command and renders errors.
//!
//! Commands:
//! - `build` - Resolve dependencies of a project and emit markup and filter modules

use anyhow::Result;
use clap::Parser;
use mpdeps::cli;
use mpdeps::core::user_friendly_error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = cli::Cli::parse();
    let config = cli.build_config();

    // RUST_LOG takes precedence over --verbose/--quiet
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => Some(EnvFilter::from_default_env()),
        Err(_) => config.log_level.as_deref().map(EnvFilter::new),
    };
    if let Some(filter) = filter {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute_with_config(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
