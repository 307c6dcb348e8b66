//! Error handling for mpdeps
//!
//! This module provides the error types used across the resolution layer and the
//! user-friendly reporting used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** ([`MpError`]) so callers can react to specific failures
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!
//! # Error Categories
//!
//! - **Resolution**: [`MpError::Resolution`] - a component, mixin or global source
//!   reference could not be mapped to a file. Always skipped and logged by the
//!   orchestrator, never fatal for a unit.
//! - **Analysis**: [`MpError::Analysis`] - the script analyzer rejected a unit's source.
//!   Returned to the caller of the compile operation.
//! - **Readiness**: [`MpError::UnitFailed`], [`MpError::WaitTimedOut`] - a consumer
//!   waiting for a record gave up.
//! - **Configuration**: [`MpError::ConfigError`], [`MpError::ConfigNotFound`].
//!
//! Public operations return [`anyhow::Result`] with an [`MpError`] as root cause, so
//! callers can `downcast_ref::<MpError>()` when they need the variant.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mpdeps::core::{MpError, user_friendly_error};
//!
//! let err: anyhow::Error = MpError::ConfigNotFound {
//!     path: "mpdeps.toml".to_string(),
//! }
//! .into();
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for mpdeps operations.
#[derive(Error, Debug)]
pub enum MpError {
    /// A reference could not be resolved to a concrete file.
    ///
    /// Raised by [`crate::host::ModuleResolver`] implementations. The orchestrator
    /// treats it as a partial failure: the single reference is skipped.
    #[error("Cannot resolve '{reference}' from {context}")]
    Resolution {
        /// The reference as written in the source (e.g. `./header.vue`)
        reference: String,
        /// Directory the reference was resolved against
        context: String,
        /// Why resolution failed
        reason: String,
    },

    /// Script analysis failed for a unit.
    #[error("Failed to analyze {unit}: {reason}")]
    Analysis {
        /// Path of the analyzed unit
        unit: String,
        /// Analyzer message
        reason: String,
    },

    /// A unit's resolution fork failed, so its record will never complete.
    #[error("Resolution of {unit} failed: {reason}")]
    UnitFailed {
        /// Path of the unit
        unit: String,
        /// Failure recorded by the fork
        reason: String,
    },

    /// A readiness wait exceeded the configured timeout.
    #[error("Timed out after {waited_ms}ms waiting for {what}")]
    WaitTimedOut {
        /// What was being waited on
        what: String,
        /// How long the wait lasted
        waited_ms: u64,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was looked up
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl MpError {
    /// Build a [`MpError::Resolution`] from its parts.
    pub fn resolution(
        reference: impl Into<String>,
        context: &std::path::Path,
        reason: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            reference: reference.into(),
            context: context.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Build a [`MpError::Analysis`] for a unit.
    pub fn analysis(unit: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Analysis {
            unit: unit.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Error wrapper carrying a suggestion and details for CLI display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: MpError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: MpError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// Walks the error chain looking for an [`MpError`]; errors that carry none are
/// wrapped as [`MpError::Other`] with the full chain as message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let Some(mp_error) = error.chain().find_map(|cause| cause.downcast_ref::<MpError>()) else {
        let message = format!("{error:#}");
        return ErrorContext::new(MpError::Other {
            message,
        });
    };

    match mp_error {
        MpError::ConfigNotFound {
            path,
        } => ErrorContext::new(MpError::ConfigNotFound {
            path: path.clone(),
        })
        .with_suggestion("Create an mpdeps.toml in the project root or pass --config <path>")
        .with_details("mpdeps looks for mpdeps.toml in the project directory"),
        MpError::ConfigError {
            message,
        } => ErrorContext::new(MpError::ConfigError {
            message: message.clone(),
        })
        .with_suggestion("Check the keys in mpdeps.toml against the documented options"),
        MpError::TomlError(e) => ErrorContext::new(MpError::ConfigError {
            message: e.to_string(),
        })
        .with_suggestion("Fix the TOML syntax in mpdeps.toml"),
        MpError::Analysis {
            unit,
            reason,
        } => ErrorContext::new(MpError::Analysis {
            unit: unit.clone(),
            reason: reason.clone(),
        })
        .with_suggestion("Check the unit's frontmatter block for YAML errors"),
        MpError::WaitTimedOut {
            what,
            waited_ms,
        } => ErrorContext::new(MpError::WaitTimedOut {
            what: what.clone(),
            waited_ms: *waited_ms,
        })
        .with_details("A unit never completed resolution; another error above is the likely cause")
        .with_suggestion("Raise readiness.timeout_ms or fix the failing unit"),
        _ => ErrorContext::new(MpError::Other {
            message: format!("{error:#}"),
        }),
    }
}
