//! Test utilities for mpdeps
//!
//! In-memory collaborators and a project fixture for driving a
//! [`BuildSession`] end to end without touching an output directory.
//!
//! - [`MemorySink`] keeps emitted artifacts in memory and counts writes
//! - [`RecordingDiagnostics`] records template errors and warnings
//! - [`CountingAnalyzer`] wraps [`FrontmatterAnalyzer`] and counts analyses per file
//! - [`ProjectFixture`] lays out sources in a temporary project
//!
//! # Example
//!
//! ```rust,no_run
//! use mpdeps::test_utils::ProjectFixture;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let project = ProjectFixture::new()?;
//! let card = project.write("src/card.vue", "<view />")?;
//! let test = project.session(project.config());
//! test.session.without_global_components();
//! test.compile_unit(&card).await?;
//! assert!(test.output.get("card.wxml").is_some());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use anyhow::{Context, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::BuildConfig;
use crate::core::UnitId;
use crate::filters::FilterDefinition;
use crate::host::{
    DiagnosticsSink, FrontmatterAnalyzer, Host, OutputSink, ParsedTemplate, ScriptAnalyzer,
    ScriptMetadata,
};
use crate::session::{BuildSession, MarkupCall};
use crate::utils::fs::{normalize_path, to_slash};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=mpdeps=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Output sink keeping artifacts in memory, keyed by forward-slash path.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, String>>,
    writes: DashMap<String, usize>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last content emitted to `path`.
    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().get(path).cloned()
    }

    /// Every path emitted so far, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    /// How often `path` was emitted.
    pub fn write_count(&self, path: &str) -> usize {
        self.writes.get(path).map_or(0, |count| *count)
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, path: &Path, content: &str) {
        let key = to_slash(path);
        *self.writes.entry(key.clone()).or_insert(0) += 1;
        self.files.lock().insert(key, content.to_string());
    }
}

/// Diagnostics sink recording every message.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    warnings: Mutex<Vec<(UnitId, String)>>,
    errors: Mutex<Vec<(UnitId, String)>>,
}

impl RecordingDiagnostics {
    /// Warnings reported so far.
    pub fn warnings(&self) -> Vec<(UnitId, String)> {
        self.warnings.lock().clone()
    }

    /// Errors reported so far.
    pub fn errors(&self) -> Vec<(UnitId, String)> {
        self.errors.lock().clone()
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    fn warning(&self, unit: &UnitId, message: &str) {
        self.warnings.lock().push((unit.clone(), message.to_string()));
    }

    fn error(&self, unit: &UnitId, message: &str) {
        self.errors.lock().push((unit.clone(), message.to_string()));
    }
}

/// [`FrontmatterAnalyzer`] that counts how often each file is analyzed.
#[derive(Debug, Default)]
pub struct CountingAnalyzer {
    analyses: DashMap<PathBuf, usize>,
    extractions: AtomicUsize,
}

impl CountingAnalyzer {
    /// How often `path` went through [`ScriptAnalyzer::analyze`].
    pub fn analyses(&self, path: &Path) -> usize {
        self.analyses.get(&normalize_path(path)).map_or(0, |count| *count)
    }

    /// Total filter extractions.
    pub fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }
}

impl ScriptAnalyzer for CountingAnalyzer {
    fn analyze(&self, path: &Path, source: &str) -> Result<ScriptMetadata> {
        *self.analyses.entry(normalize_path(path)).or_insert(0) += 1;
        FrontmatterAnalyzer.analyze(path, source)
    }

    fn extract_filters(&self, path: &Path, source: &str) -> Result<Option<FilterDefinition>> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        Ok(FrontmatterAnalyzer::split(path, source)?.0.filters)
    }
}

/// A session wired to in-memory collaborators.
#[derive(Clone)]
pub struct TestSession {
    /// The session under test
    pub session: BuildSession,
    /// Emitted artifacts
    pub output: Arc<MemorySink>,
    /// Reported template diagnostics
    pub diagnostics: Arc<RecordingDiagnostics>,
    /// Analysis counters
    pub analyzer: Arc<CountingAnalyzer>,
}

impl TestSession {
    /// Compile one unit the way `mpdeps build` does: analyze, resolve, then
    /// generate its markup from the template after the frontmatter.
    pub async fn compile_unit(&self, unit: &Path) -> Result<()> {
        let source = std::fs::read_to_string(unit)
            .with_context(|| format!("Failed to read {}", unit.display()))?;
        let module_id = format!("data-v-{}", self.session.store().len() + 1);
        let handle = self.session.compile_script(unit, &source, &module_id)?;
        let (_, template) = FrontmatterAnalyzer::split(unit, &source)?;
        self.session.generate_markup(MarkupCall::new(unit, ParsedTemplate::new(template))).await?;
        handle.wait().await
    }

    /// Compile an entry from its file.
    pub async fn compile_entry(&self, entry: &Path) -> Result<crate::session::EntryOutcome> {
        let source = std::fs::read_to_string(entry)
            .with_context(|| format!("Failed to read {}", entry.display()))?;
        self.session.compile_entry(entry, &source).await
    }
}

/// Temporary project directory with helpers to lay out sources.
pub struct ProjectFixture {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl ProjectFixture {
    /// Create an empty project.
    pub fn new() -> Result<Self> {
        init_test_logging(None);
        let temp_dir = TempDir::new()?;
        let root = normalize_path(temp_dir.path());
        Ok(Self {
            _temp_dir: temp_dir,
            root,
        })
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `relative` inside the project.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Default configuration rooted at the project, with `src/main.js` as the
    /// application entry when that file exists.
    pub fn config(&self) -> BuildConfig {
        let mut config = BuildConfig::default();
        if self.path("src/main.js").exists() {
            config.app = Some(PathBuf::from("src/main.js"));
        }
        config.resolve_paths(&self.root)
    }

    /// Session over `config` with in-memory output and diagnostics.
    pub fn session(&self, config: BuildConfig) -> TestSession {
        let output = Arc::new(MemorySink::new());
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let analyzer = Arc::new(CountingAnalyzer::default());
        let host = Host::for_config(&config)
            .unwrap_or_else(|e| panic!("default host: {e:#}"))
            .with_output(output.clone())
            .with_diagnostics(diagnostics.clone())
            .with_analyzer(analyzer.clone());

        TestSession {
            session: BuildSession::new(config, host),
            output,
            diagnostics,
            analyzer,
        }
    }
}
