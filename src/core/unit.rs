//! Compilation unit identity and classification.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::fs::normalize_path;

/// Identity of one compiled source unit: its absolute, normalized source path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UnitId(PathBuf);

impl UnitId {
    /// Create a unit identity from a source path; `.` and `..` are folded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(normalize_path(&path.into()))
    }

    /// The unit's source path.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Directory used as the resolution context for the unit's references.
    pub fn context(&self) -> &Path {
        self.0.parent().unwrap_or_else(|| Path::new("/"))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&Path> for UnitId {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&PathBuf> for UnitId {
    fn from(path: &PathBuf) -> Self {
        Self::new(path.as_path())
    }
}

impl From<PathBuf> for UnitId {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

/// Role a unit plays in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// The application entry; drives the global component registry.
    App,
    /// A page entry.
    Page,
    /// Any other unit.
    Component,
}

impl PageType {
    /// Whether this unit is an application or page entry.
    pub const fn is_entry(self) -> bool {
        matches!(self, Self::App | Self::Page)
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => write!(f, "app"),
            Self::Page => write!(f, "page"),
            Self::Component => write!(f, "component"),
        }
    }
}
