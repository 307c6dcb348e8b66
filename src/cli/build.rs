//! The `build` command.
//!
//! Compiles the application entry first so the global component registry is
//! published, then the page entries, then every component unit below the
//! source directory. Units are compiled concurrently; each one's markup is
//! generated as soon as its record is complete.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use walkdir::WalkDir;

use super::CliConfig;
use crate::config::BuildConfig;
use crate::constants::CONFIG_FILE_NAME;
use crate::core::MpError;
use crate::host::{FrontmatterAnalyzer, Host, ParsedTemplate};
use crate::session::{BuildSession, BuildSummary, MarkupCall};

/// Resolve dependencies and emit markup for a project.
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Project directory (defaults to the current directory)
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Print the build summary as JSON
    #[arg(long)]
    json: bool,
}

impl BuildCommand {
    /// Run the build.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded, the application
    /// entry cannot be compiled, or any unit failed.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let root = match self.project {
            Some(project) => project,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let config = match &cli.config_path {
            Some(path) => BuildConfig::load_from(path).await?,
            None => BuildConfig::load_or_default(&root.join(CONFIG_FILE_NAME), &root).await?,
        };

        let session = BuildSession::new(config.clone(), Host::for_config(&config)?);
        let unit_errors = run_build(&session).await?;
        let summary = session.summary();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else if !cli.is_quiet() {
            print_summary(&summary, &config);
        }

        if unit_errors > 0 || !summary.failed.is_empty() {
            return Err(MpError::Other {
                message: format!("{} of {} units failed", unit_errors.max(summary.failed.len()), summary.units),
            }
            .into());
        }
        Ok(())
    }
}

/// Compile every entry and unit of the session's project.
///
/// Returns the number of units that could not be compiled; their errors are
/// logged.
///
/// # Errors
///
/// Returns an error if the application entry cannot be read or analyzed.
pub async fn run_build(session: &BuildSession) -> Result<usize> {
    let config = session.config();

    match &config.app {
        Some(app) => {
            let source = read_source(app).await?;
            let outcome = session.compile_entry(app, &source).await?;
            if let Some(commit) = outcome.commit {
                tracing::info!("Global components at version {}", commit.version);
            }
        }
        None => session.without_global_components(),
    }

    for page in &config.pages {
        let result = match read_source(page).await {
            Ok(source) => session.compile_entry(page, &source).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("Skipping page {}: {e:#}", page.display());
        }
    }

    let units = collect_units(config);
    tracing::info!("Compiling {} units", units.len());

    let results = futures::future::join_all(
        units.iter().enumerate().map(|(index, unit)| compile_unit(session, unit, index + 1)),
    )
    .await;

    let mut failed = 0;
    for (unit, result) in units.iter().zip(results) {
        if let Err(e) = result {
            tracing::error!("{}: {e:#}", unit.display());
            failed += 1;
        }
    }
    Ok(failed)
}

fn collect_units(config: &BuildConfig) -> Vec<PathBuf> {
    let entries: Vec<&Path> = config.app.iter().chain(&config.pages).map(PathBuf::as_path).collect();
    let mut units: Vec<PathBuf> = WalkDir::new(&config.source_dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && config.is_unit_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .filter(|path| !entries.contains(&path.as_path()))
        .collect();
    units.sort();
    units
}

async fn compile_unit(session: &BuildSession, unit: &Path, index: usize) -> Result<()> {
    let source = read_source(unit).await?;
    let handle = session.compile_script(unit, &source, &format!("data-v-{index}"))?;
    let (_, template) = FrontmatterAnalyzer::split(unit, &source)?;

    session.generate_markup(MarkupCall::new(unit, ParsedTemplate::new(template))).await?;
    handle.wait().await
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.with_context(|| format!("Failed to read {}", path.display()))
}

fn print_summary(summary: &BuildSummary, config: &BuildConfig) {
    println!(
        "{} {} units for {} into {}",
        "Built".green().bold(),
        summary.complete,
        summary.platform.cyan(),
        config.output_dir.display()
    );
    if let Some(version) = summary.registry_version {
        println!(
            "  {} global components (registry version {version})",
            summary.global_components
        );
    }
    println!(
        "  {} markup files, {} filter modules, {} mixins extracted",
        summary.markups, summary.filter_modules, summary.mixins_extracted
    );
    if summary.replayed > 0 {
        println!("  {} units refreshed after global component changes", summary.replayed);
    }
    for failed in &summary.failed {
        println!("{} {}: {}", "Failed".red().bold(), failed.unit, failed.reason);
    }
}
