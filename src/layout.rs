//! Mapping from source files to generated artifacts.
//!
//! Every source unit has a stable location in the output tree, derived from its
//! path below the source directory. Files outside the source directory (for
//! example under `node_modules`) are placed by their path below the project
//! root, with `node_modules` renamed to `npm`.
//!
//! ```text
//! src/components/header.vue   ->  /components/header.wxml   (export components_header)
//! src/pages/a/index.vue       ->  /pages/a/index.wxml        (export pages_a_index)
//! src/pages/a/index.vue       ->  pages/a/index.wxs          (module indexFilters)
//! ```

use std::path::{Path, PathBuf};

use heck::{ToKebabCase, ToLowerCamelCase};

use crate::config::{BuildConfig, Platform};
use crate::constants::FILTER_MODULE_SUFFIX;
use crate::store::ComponentTarget;
use crate::utils::fs::{normalize_path, to_slash};

/// Location and module name of a filter module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutput {
    /// Path of the module relative to the output root
    pub file_path: PathBuf,
    /// Module name used to import it
    pub module_name: String,
}

/// Normalize a component usage name the way templates reference it (kebab-case).
///
/// ```rust
/// use mpdeps::layout::normalize_component_name;
///
/// assert_eq!(normalize_component_name("HeaderBar"), "header-bar");
/// assert_eq!(normalize_component_name("header-bar"), "header-bar");
/// ```
pub fn normalize_component_name(name: &str) -> String {
    name.to_kebab_case()
}

/// Markup of a page entry: imports its root component and instantiates it
/// with the page data.
pub fn page_markup(root: &ComponentTarget) -> String {
    format!("<import src=\"{}\" />\n{}", root.target_path, page_instance(root))
}

/// Instantiation of a page's root template with the page data, for markup
/// that already defines the template.
pub fn page_instance(root: &ComponentTarget) -> String {
    format!("<template is=\"{}\" data=\"{{{{ ...$root['0'], $root }}}}\"/>\n", root.export_name)
}

/// Derives output locations from source paths for one build configuration.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    project_root: PathBuf,
    source_root: PathBuf,
    platform: Platform,
}

impl OutputLayout {
    /// Build the layout for a configuration whose paths are already absolute.
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            project_root: config.project_root.clone(),
            source_root: config.source_dir.clone(),
            platform: config.platform,
        }
    }

    /// Target platform.
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Output-relative location of `source`, without extension.
    fn output_stem(&self, source: &Path) -> PathBuf {
        let source = normalize_path(source);
        let relative = if let Ok(rel) = source.strip_prefix(&self.source_root) {
            rel.to_path_buf()
        } else if let Ok(rel) = source.strip_prefix(&self.project_root) {
            rel.components()
                .map(|c| {
                    let part = c.as_os_str();
                    if part == "node_modules" { "npm".into() } else { part.to_os_string() }
                })
                .collect()
        } else {
            PathBuf::from("external").join(source.file_name().unwrap_or_default())
        };

        let stem = relative.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
        relative.with_file_name(stem)
    }

    fn with_ext(stem: &Path, ext: &str) -> PathBuf {
        let name = stem.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        stem.with_file_name(format!("{name}.{ext}"))
    }

    /// Output-relative path of the markup generated for `source`.
    pub fn markup_output(&self, source: &Path) -> PathBuf {
        Self::with_ext(&self.output_stem(source), self.platform.file_ext().template)
    }

    /// Name of the template exported by the markup of `source`.
    ///
    /// Built from the kebab-cased path segments joined with `_`, so it is unique
    /// per output location.
    pub fn export_name(&self, source: &Path) -> String {
        self.output_stem(source)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_kebab_case())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Where a component implemented by `source` is imported from.
    pub fn component_target(&self, source: &Path) -> ComponentTarget {
        ComponentTarget {
            target_path: format!("/{}", to_slash(&self.markup_output(source))),
            export_name: self.export_name(source),
        }
    }

    /// Location and module name of the filter module generated for `source`.
    pub fn filter_output(&self, source: &Path) -> FilterOutput {
        let stem = self.output_stem(source);
        let base = stem.file_name().map(|n| n.to_string_lossy().to_lower_camel_case()).unwrap_or_default();
        FilterOutput {
            file_path: Self::with_ext(&stem, self.platform.file_ext().filter),
            module_name: format!("{base}{FILTER_MODULE_SUFFIX}"),
        }
    }
}
