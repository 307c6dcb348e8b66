//! Collaborators the build session depends on.
//!
//! The session never parses scripts, resolves module references, renders
//! templates or touches the output directory itself. Those concerns sit behind
//! the traits in this module so a host compiler can plug in its own toolchain:
//!
//! - [`ScriptAnalyzer`]: extracts imports, components, mixins and filters from a unit
//! - [`ModuleResolver`]: maps a reference written in a unit to a file
//! - [`TemplateRenderer`]: turns a parsed template into platform markup
//! - [`OutputSink`]: receives generated artifacts
//! - [`DiagnosticsSink`]: receives template errors and warnings
//!
//! The defaults shipped here ([`FrontmatterAnalyzer`], [`FsResolver`],
//! [`BasicRenderer`], [`FsOutputSink`], [`TracingDiagnostics`]) back the
//! `mpdeps build` command and read units that declare their metadata in YAML
//! frontmatter.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::config::{BuildConfig, Platform};
use crate::core::UnitId;
use crate::filters::FilterDefinition;
use crate::store::{ComponentMap, FilterDescriptor};

mod diagnostics;
mod frontmatter;
mod output;
mod render;
mod resolve;

pub use diagnostics::TracingDiagnostics;
pub use frontmatter::FrontmatterAnalyzer;
pub use output::FsOutputSink;
pub use render::BasicRenderer;
pub use resolve::FsResolver;

/// What analysis of a unit's script yields.
///
/// Reference maps keep declaration order; it decides which declaration wins
/// when global components collide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScriptMetadata {
    /// Import bindings to module references
    pub imports: IndexMap<String, String>,
    /// Local component usage names to module references
    pub components: IndexMap<String, String>,
    /// Mixin module references, in declaration order
    pub mixins: Vec<String>,
    /// Global component names to module references (application entry only)
    pub global_components: IndexMap<String, String>,
    /// Root component of a page entry
    pub root_component: Option<String>,
    /// Filters defined by the unit itself
    pub filters: Option<FilterDefinition>,
}

/// Extracts dependency metadata from a unit's source.
pub trait ScriptAnalyzer: Send + Sync {
    /// Analyze `source`, read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::MpError::Analysis`] when the source cannot be analyzed.
    fn analyze(&self, path: &Path, source: &str) -> Result<ScriptMetadata>;

    /// Extract only the filters defined in `source`.
    fn extract_filters(&self, path: &Path, source: &str) -> Result<Option<FilterDefinition>> {
        Ok(self.analyze(path, source)?.filters)
    }
}

/// Future returned by [`ModuleResolver::resolve`].
pub type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;

/// Maps a module reference to a file.
pub trait ModuleResolver: Send + Sync {
    /// Resolve `reference` as written in a module located in the directory `context`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::MpError::Resolution`] when no file matches.
    fn resolve<'a>(&'a self, context: &'a Path, reference: &'a str) -> ResolveFuture<'a>;
}

/// A unit's template, as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTemplate {
    /// Template markup
    pub source: String,
}

impl ParsedTemplate {
    /// Wrap template markup.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Everything a renderer needs besides the template.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Unit being rendered
    pub unit: UnitId,
    /// Name of the template the markup exports
    pub export_name: String,
    /// Components the template may use
    pub components: ComponentMap,
    /// Filter module the markup includes, if any
    pub filters: Option<FilterDescriptor>,
    /// Target platform
    pub platform: Platform,
}

/// Result of rendering one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    /// Generated markup
    pub code: String,
    /// Template errors; the markup is emitted regardless
    pub errors: Vec<String>,
    /// Template warnings
    pub warnings: Vec<String>,
}

/// Turns templates into platform markup.
pub trait TemplateRenderer: Send + Sync {
    /// Render `template`.
    fn render(&self, template: &ParsedTemplate, options: &RenderOptions) -> RenderOutput;
}

/// Receives generated artifacts.
pub trait OutputSink: Send + Sync {
    /// Write `content` to `path`, relative to the output root.
    ///
    /// Fire-and-forget: failures are the sink's to report.
    fn emit(&self, path: &Path, content: &str);
}

/// Receives template diagnostics.
pub trait DiagnosticsSink: Send + Sync {
    /// Report a warning for `unit`.
    fn warning(&self, unit: &UnitId, message: &str);
    /// Report an error for `unit`.
    fn error(&self, unit: &UnitId, message: &str);
}

/// The full set of collaborators of a build session.
#[derive(Clone)]
pub struct Host {
    /// Script analyzer
    pub analyzer: Arc<dyn ScriptAnalyzer>,
    /// Module resolver
    pub resolver: Arc<dyn ModuleResolver>,
    /// Template renderer
    pub renderer: Arc<dyn TemplateRenderer>,
    /// Output sink
    pub output: Arc<dyn OutputSink>,
    /// Diagnostics sink
    pub diagnostics: Arc<dyn DiagnosticsSink>,
}

impl Host {
    /// Default collaborators for a project: frontmatter analysis, file-system
    /// resolution, the basic renderer, and writes below `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer cannot be constructed.
    pub fn for_config(config: &BuildConfig) -> Result<Self> {
        Ok(Self {
            analyzer: Arc::new(FrontmatterAnalyzer),
            resolver: Arc::new(FsResolver::new(config)),
            renderer: Arc::new(BasicRenderer::new()?),
            output: Arc::new(FsOutputSink::new(&config.output_dir)),
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    /// Read `path` and analyze it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or analyzed.
    pub async fn analyze_file(&self, path: &Path) -> Result<ScriptMetadata> {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.analyzer.analyze(path, &source)
    }

    /// Read `path` and extract the filters it defines.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or analyzed.
    pub async fn extract_file_filters(&self, path: &Path) -> Result<Option<FilterDefinition>> {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.analyzer.extract_filters(path, &source)
    }

    /// Replace the analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn ScriptAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Replace the resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the output sink.
    #[must_use]
    pub fn with_output(mut self, output: Arc<dyn OutputSink>) -> Self {
        self.output = output;
        self
    }

    /// Replace the diagnostics sink.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}
