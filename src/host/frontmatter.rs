//! Script analysis from YAML frontmatter.
//!
//! A unit declares its dependencies in a frontmatter block; the rest of the
//! file is its template:
//!
//! ```text
//! ---
//! imports:
//!   Header: ./components/header.vue
//! components:
//!   Header: Header
//! mixins:
//!   - ./mixins/text.js
//! filters:
//!   upper: "function (s) { return s.toUpperCase() }"
//! ---
//! <view><header /></view>
//! ```
//!
//! Component, global component, mixin and root component values may name an
//! import binding instead of a path; they are replaced by the import's reference.

use std::path::Path;

use anyhow::Result;
use gray_matter::Matter;
use gray_matter::engine::YAML;
use indexmap::IndexMap;

use super::{ScriptAnalyzer, ScriptMetadata};
use crate::core::MpError;

/// Reads [`ScriptMetadata`] from a YAML frontmatter block.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrontmatterAnalyzer;

impl FrontmatterAnalyzer {
    /// Split a unit into its metadata and the template that follows the frontmatter.
    ///
    /// A file without frontmatter has empty metadata and is all template.
    ///
    /// # Errors
    ///
    /// Returns [`MpError::Analysis`] if the frontmatter is not valid YAML or does
    /// not have the expected shape.
    pub fn split(path: &Path, source: &str) -> Result<(ScriptMetadata, String)> {
        let matter = Matter::<YAML>::new();
        let parsed = matter
            .parse::<serde_yaml::Value>(source)
            .map_err(|e| MpError::analysis(path, e.to_string()))?;

        let metadata = match parsed.data {
            Some(value) if !value.is_null() => serde_yaml::from_value::<ScriptMetadata>(value)
                .map_err(|e| MpError::analysis(path, e.to_string()))?,
            _ => ScriptMetadata::default(),
        };

        Ok((substitute_bindings(metadata), parsed.content))
    }
}

fn substitute_bindings(mut metadata: ScriptMetadata) -> ScriptMetadata {
    let imports = metadata.imports.clone();
    let lookup = |value: &mut String| {
        if let Some(reference) = imports.get(value.as_str()) {
            value.clone_from(reference);
        }
    };
    let rewrite = |map: &mut IndexMap<String, String>| map.values_mut().for_each(lookup);

    rewrite(&mut metadata.components);
    rewrite(&mut metadata.global_components);
    metadata.mixins.iter_mut().for_each(lookup);
    if let Some(root) = metadata.root_component.as_mut() {
        lookup(root);
    }
    metadata
}

impl ScriptAnalyzer for FrontmatterAnalyzer {
    fn analyze(&self, path: &Path, source: &str) -> Result<ScriptMetadata> {
        Self::split(path, source).map(|(metadata, _)| metadata)
    }
}
