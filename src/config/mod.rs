//! Project build configuration for mpdeps.
//!
//! The configuration lives in `mpdeps.toml` at the project root and tells the
//! session where sources and outputs live, which units are entries, which
//! mini-program platform is targeted, and how references are resolved.
//!
//! # File Format
//!
//! ```toml
//! source_dir = "src"
//! output_dir = "dist"
//! platform = "wx"            # wx | my | swan | tt
//! app = "src/main.js"
//! pages = ["src/pages/index/main.js", "src/pages/logs/main.js"]
//! unit_extensions = [".vue"]
//! resolve_extensions = [".vue", ".js", ".ts", ".json"]
//!
//! [aliases]
//! "@" = "src"
//!
//! [readiness]
//! poll_interval_ms = 20
//! timeout_ms = 30000         # optional; waits are unbounded when absent
//! ```
//!
//! Relative paths are resolved against `project_root`, which itself defaults to
//! the directory containing the configuration file.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mpdeps::config::BuildConfig;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = BuildConfig::load_from(Path::new("mpdeps.toml")).await?;
//! println!("Building {} pages for {}", config.pages.len(), config.platform);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{DEFAULT_POLL_INTERVAL_MS, default_poll_interval};
use crate::core::{MpError, PageType};
use crate::utils::fs::normalize_path;

/// Target mini-program platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// WeChat
    #[default]
    Wx,
    /// Alipay
    My,
    /// Baidu
    Swan,
    /// ByteDance
    Tt,
}

/// Output file extensions of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileExt {
    /// Extension of generated markup files, without the leading dot
    pub template: &'static str,
    /// Extension of generated filter modules, without the leading dot
    pub filter: &'static str,
}

/// How a filter module exposes its functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleSyntax {
    /// `module.exports = {...}` / `require(...)`
    CommonJs,
    /// `export default {...}` / `import x from ...`
    EsModule,
}

impl Platform {
    /// File extensions used for generated artifacts.
    pub const fn file_ext(self) -> FileExt {
        match self {
            Self::Wx => FileExt {
                template: "wxml",
                filter: "wxs",
            },
            Self::My => FileExt {
                template: "axml",
                filter: "sjs",
            },
            Self::Swan => FileExt {
                template: "swan",
                filter: "filter.js",
            },
            Self::Tt => FileExt {
                template: "ttml",
                filter: "sjs",
            },
        }
    }

    /// Module syntax of generated filter modules.
    pub const fn module_syntax(self) -> ModuleSyntax {
        match self {
            Self::My => ModuleSyntax::EsModule,
            _ => ModuleSyntax::CommonJs,
        }
    }

    /// Whether a page's markup is appended to its root component's markup
    /// instead of being emitted on its own.
    pub const fn appends_page_markup(self) -> bool {
        matches!(self, Self::My)
    }

    /// Markup tag that includes a filter module under a module name.
    pub fn filter_include(self, src: &str, module: &str) -> String {
        match self {
            Self::Wx => format!("<wxs src=\"{src}\" module=\"{module}\" />"),
            Self::My => format!("<import-sjs from=\"{src}\" name=\"{module}\" />"),
            Self::Swan => format!("<filter src=\"{src}\" module=\"{module}\" />"),
            Self::Tt => format!("<sjs src=\"{src}\" module=\"{module}\" />"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wx => "wx",
            Self::My => "my",
            Self::Swan => "swan",
            Self::Tt => "tt",
        };
        write!(f, "{name}")
    }
}

/// Readiness gate tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Interval at which waits re-check their predicate, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on any single wait, in milliseconds. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: None,
        }
    }
}

impl ReadinessConfig {
    /// Poll interval as a [`Duration`]; zero falls back to the default.
    pub fn poll_interval(&self) -> Duration {
        if self.poll_interval_ms == 0 {
            default_poll_interval()
        } else {
            Duration::from_millis(self.poll_interval_ms)
        }
    }

    /// Wait timeout as a [`Duration`], if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Build configuration of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Project root; relative paths below resolve against it.
    pub project_root: PathBuf,
    /// Directory holding the sources (default `src`).
    pub source_dir: PathBuf,
    /// Directory receiving generated artifacts (default `dist`).
    pub output_dir: PathBuf,
    /// Target platform.
    pub platform: Platform,
    /// Application entry unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<PathBuf>,
    /// Page entry units.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PathBuf>,
    /// Extensions of component units compiled by `mpdeps build`.
    pub unit_extensions: Vec<String>,
    /// Extensions tried, in order, when a reference omits one.
    pub resolve_extensions: Vec<String>,
    /// Reference prefixes mapped to directories (e.g. `@` to `src`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, PathBuf>,
    /// Readiness gate tuning.
    pub readiness: ReadinessConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            source_dir: PathBuf::from("src"),
            output_dir: PathBuf::from("dist"),
            platform: Platform::default(),
            app: None,
            pages: Vec::new(),
            unit_extensions: vec![".vue".to_string()],
            resolve_extensions: [".vue", ".js", ".ts", ".json"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            aliases: BTreeMap::new(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Load a configuration file and absolutize its paths.
    ///
    /// `project_root` defaults to the directory containing the file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist ([`MpError::ConfigNotFound`])
    /// - The file cannot be read or contains invalid TOML
    /// - The configuration fails [`BuildConfig::validate`]
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MpError::ConfigNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(MpError::from)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let config = config.resolve_paths(&base);
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise a default configuration rooted at `root`.
    pub async fn load_or_default(path: &Path, root: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            let config = Self::default().resolve_paths(root);
            config.validate()?;
            Ok(config)
        }
    }

    /// Make every configured path absolute, resolving relative ones against `base`.
    #[must_use]
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let base = if base.is_absolute() {
            base.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| base.to_path_buf(), |cwd| cwd.join(base))
        };

        self.project_root = normalize_path(&base.join(&self.project_root));
        let root = self.project_root.clone();
        let absolutize = |p: &Path| normalize_path(&root.join(p));

        self.source_dir = absolutize(&self.source_dir);
        self.output_dir = absolutize(&self.output_dir);
        self.app = self.app.as_deref().map(absolutize);
        self.pages = self.pages.iter().map(|p| absolutize(p)).collect();
        self.aliases = self.aliases.iter().map(|(k, v)| (k.clone(), absolutize(v))).collect();
        self
    }

    /// Check the configuration for values the session cannot work with.
    pub fn validate(&self) -> Result<()> {
        for ext in self.unit_extensions.iter().chain(&self.resolve_extensions) {
            if !ext.starts_with('.') {
                return Err(MpError::ConfigError {
                    message: format!("extension '{ext}' must start with '.'"),
                }
                .into());
            }
        }

        if let Some(app) = self.app.as_ref().filter(|app| self.pages.contains(app)) {
            return Err(MpError::ConfigError {
                message: format!("{} is listed both as app and as page", app.display()),
            }
            .into());
        }

        Ok(())
    }

    /// Classify a unit as app entry, page entry or plain component.
    pub fn classify(&self, unit: &Path) -> PageType {
        let unit = normalize_path(unit);
        if self.app.as_deref() == Some(unit.as_path()) {
            PageType::App
        } else if self.pages.iter().any(|p| *p == unit) {
            PageType::Page
        } else {
            PageType::Component
        }
    }

    /// Whether `path` has one of the configured component unit extensions.
    pub fn is_unit_file(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.unit_extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}
