//! File-system module resolution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{ModuleResolver, ResolveFuture};
use crate::config::BuildConfig;
use crate::core::MpError;
use crate::utils::fs::normalize_path;

/// Resolves references the way a bundler would.
///
/// - `./x` and `../x` resolve against the referencing module's directory
/// - absolute paths are taken as is
/// - `alias/x` resolves below the aliased directory (longest alias first)
/// - anything else is looked up in `node_modules`, walking up from the context
///   to the project root
///
/// Each candidate is tried as written, then with every configured extension,
/// then as a directory containing `index` plus an extension.
#[derive(Debug, Clone)]
pub struct FsResolver {
    project_root: PathBuf,
    aliases: BTreeMap<String, PathBuf>,
    extensions: Vec<String>,
}

impl FsResolver {
    /// Resolver configured from a build configuration.
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            project_root: config.project_root.clone(),
            aliases: config.aliases.clone(),
            extensions: config.resolve_extensions.clone(),
        }
    }

    fn bases(&self, context: &Path, reference: &str) -> Vec<PathBuf> {
        if reference.starts_with("./") || reference.starts_with("../") || reference == "." {
            return vec![context.join(reference)];
        }
        if Path::new(reference).is_absolute() {
            return vec![PathBuf::from(reference)];
        }

        let mut aliases: Vec<_> = self.aliases.iter().collect();
        aliases.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));
        for (prefix, dir) in aliases {
            if reference == prefix {
                return vec![dir.clone()];
            }
            if let Some(rest) = reference.strip_prefix(prefix.as_str()).and_then(|r| r.strip_prefix('/')) {
                return vec![dir.join(rest)];
            }
        }

        let mut bases = Vec::new();
        let mut dir = Some(context);
        while let Some(current) = dir {
            bases.push(current.join("node_modules").join(reference));
            if current == self.project_root {
                break;
            }
            dir = current.parent();
        }
        let fallback = self.project_root.join("node_modules").join(reference);
        if !bases.contains(&fallback) {
            bases.push(fallback);
        }
        bases
    }

    fn candidates(&self, base: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![base.to_path_buf()];
        let name = base.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        candidates.extend(self.extensions.iter().map(|ext| base.with_file_name(format!("{name}{ext}"))));
        candidates.extend(self.extensions.iter().map(|ext| base.join(format!("index{ext}"))));
        candidates
    }

    async fn resolve_path(&self, context: &Path, reference: &str) -> Result<PathBuf> {
        for base in self.bases(context, reference) {
            for candidate in self.candidates(&normalize_path(&base)) {
                if tokio::fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                    tracing::trace!(target: "resolve", "{reference} -> {}", candidate.display());
                    return Ok(candidate);
                }
            }
        }
        Err(MpError::resolution(reference, context, "no matching file").into())
    }
}

impl ModuleResolver for FsResolver {
    fn resolve<'a>(&'a self, context: &'a Path, reference: &'a str) -> ResolveFuture<'a> {
        Box::pin(self.resolve_path(context, reference))
    }
}
