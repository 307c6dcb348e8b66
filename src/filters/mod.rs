//! Filter definitions and the auxiliary modules generated from them.
//!
//! A filter is a named template utility function. A unit may define filters
//! itself and may pull more in through mixins. Every mixin that defines filters
//! gets its own module in the output; the unit's module imports those and
//! exposes one merged table:
//!
//! ```text
//! var __mixin0 = require("../../mixins/text.wxs");
//!
//! module.exports = {
//!   upper: __mixin0.upper,
//!   trim: function (s) { return s.trim() },
//! };
//! ```
//!
//! Mixins are merged in declaration order, then the unit's own filters. When a
//! name is defined more than once the last definition wins, so local filters
//! override every mixin.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ModuleSyntax;
use crate::constants::MIXIN_BINDING_PREFIX;
use crate::utils::fs::{relative_path, to_slash};

/// Named filter functions, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterDefinition {
    functions: IndexMap<String, String>,
}

impl FilterDefinition {
    /// Create an empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a filter; a replaced filter keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.functions.insert(name.into(), body.into());
    }

    /// Body of the named filter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.functions.get(name).map(String::as_str)
    }

    /// Filter names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Iterate `(name, body)` pairs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no filter is defined.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterDefinition {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            functions: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A mixin filter module the unit's module imports.
#[derive(Debug, Clone)]
pub struct MixinImport {
    /// Output path of the mixin's module, relative to the output root
    pub output_path: std::path::PathBuf,
    /// Filters the mixin defines
    pub definition: Arc<FilterDefinition>,
}

/// Where a merged filter comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin<'a> {
    Mixin(usize),
    Local(&'a str),
}

fn export_table(entries: &[(String, String)], syntax: ModuleSyntax) -> String {
    let mut out = String::from(match syntax {
        ModuleSyntax::CommonJs => "module.exports = {\n",
        ModuleSyntax::EsModule => "export default {\n",
    });
    for (name, value) in entries {
        out.push_str(&format!("  {name}: {value},\n"));
    }
    out.push_str("};\n");
    out
}

/// Render a standalone module exporting `definition`.
pub fn render_module(definition: &FilterDefinition, syntax: ModuleSyntax) -> String {
    let entries: Vec<_> =
        definition.iter().map(|(name, body)| (name.to_string(), body.to_string())).collect();
    export_table(&entries, syntax)
}

/// Import path of `target` as seen from the module at `from`, both relative to
/// the output root. Always starts with `./` or `../`.
pub fn import_path(from: &Path, target: &Path) -> String {
    let from_dir = from.parent().unwrap_or_else(|| Path::new(""));
    let relative = to_slash(&relative_path(from_dir, target));
    if relative.starts_with("../") {
        relative
    } else {
        format!("./{relative}")
    }
}

/// Merge mixin filters and the unit's own filters into one module.
///
/// `unit_output` is the output path of the unit's filter module, used to
/// address the mixin modules relatively. Returns `None` when the merge yields
/// no filters at all.
pub fn combine(
    local: Option<&FilterDefinition>,
    mixins: &[MixinImport],
    unit_output: &Path,
    syntax: ModuleSyntax,
) -> Option<String> {
    let mut merged: IndexMap<&str, Origin<'_>> = IndexMap::new();
    for (index, mixin) in mixins.iter().enumerate() {
        for name in mixin.definition.names() {
            merged.insert(name, Origin::Mixin(index));
        }
    }
    for (name, body) in local.into_iter().flat_map(FilterDefinition::iter) {
        merged.insert(name, Origin::Local(body));
    }

    if merged.is_empty() {
        return None;
    }

    let mut out = String::new();
    for (index, mixin) in mixins.iter().enumerate() {
        if mixin.definition.is_empty() {
            continue;
        }
        let src = import_path(unit_output, &mixin.output_path);
        let line = match syntax {
            ModuleSyntax::CommonJs => {
                format!("var {MIXIN_BINDING_PREFIX}{index} = require(\"{src}\");\n")
            }
            ModuleSyntax::EsModule => format!("import {MIXIN_BINDING_PREFIX}{index} from \"{src}\";\n"),
        };
        out.push_str(&line);
    }
    if !out.is_empty() {
        out.push('\n');
    }

    let entries: Vec<_> = merged
        .into_iter()
        .map(|(name, origin)| {
            let value = match origin {
                Origin::Mixin(index) => format!("{MIXIN_BINDING_PREFIX}{index}.{name}"),
                Origin::Local(body) => body.to_string(),
            };
            (name.to_string(), value)
        })
        .collect();
    out.push_str(&export_table(&entries, syntax));
    Some(out)
}
