//! File system helpers for output emission and path arithmetic.
//!
//! Output files are written atomically (temp file in the target directory, then
//! rename) so a concurrent reader, or a replayed emission racing the first one,
//! never observes a partially written artifact.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// # Examples
///
/// ```rust,no_run
/// use mpdeps::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("dist/pages/index"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Writes content to a uniquely named temporary file next to the target
/// 2. Syncs the temporary file to disk
/// 3. Renames it over the target path
///
/// Parent directories are created when missing.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().with_context(|| "Failed to sync file to disk")?;

    temp.persist(path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Safely writes a string to a file using [`atomic_write`].
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Normalizes a path by resolving `.` and `..` components without touching the filesystem.
///
/// A `..` that would climb above the start of a relative path is kept.
///
/// ```rust
/// use mpdeps::utils::fs::normalize_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(normalize_path(Path::new("/foo/./bar/../baz")), PathBuf::from("/foo/baz"));
/// assert_eq!(normalize_path(Path::new("../src/./lib.rs")), PathBuf::from("../src/lib.rs"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Computes the path of `target` relative to the directory `base`.
///
/// Both paths are normalized first. Paths on different roots fall back to `target`.
///
/// ```rust
/// use mpdeps::utils::fs::relative_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     relative_path(Path::new("/out/pages/b"), Path::new("/out/mixins/m1.wxs")),
///     PathBuf::from("../../mixins/m1.wxs")
/// );
/// ```
#[must_use]
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base = normalize_path(base);
    let target = normalize_path(target);

    if base.has_root() != target.has_root() {
        return target;
    }

    let base_parts: Vec<_> = base.components().collect();
    let target_parts: Vec<_> = target.components().collect();
    let common = base_parts.iter().zip(&target_parts).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

/// Renders a path with forward slashes, the separator used inside generated markup.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::RootDir => Some(String::new()),
            Component::Prefix(_) => None,
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect::<Vec<_>>()
        .join("/")
}
