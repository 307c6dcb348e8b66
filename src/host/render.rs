//! A minimal template renderer.
//!
//! [`BasicRenderer`] does not compile template expressions. It scans the markup
//! for tags, imports the markup of every component the template uses, includes
//! the unit's filter module, and wraps the body in a named template:
//!
//! ```text
//! <import src="/components/header.wxml" />
//! <wxs src="./index.wxs" module="indexFilters" />
//! <template name="pages_index_index">
//! <view><header /></view>
//! </template>
//! ```

use std::collections::BTreeSet;

use anyhow::Result;
use regex::Regex;
use strsim::levenshtein;

use super::{ParsedTemplate, RenderOptions, RenderOutput, TemplateRenderer};
use crate::layout::normalize_component_name;

/// Maximum edit distance, as a percentage of the tag length, for a component
/// name to be suggested for an unknown tag.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Scans templates with a tag pattern; see the module docs.
#[derive(Debug, Clone)]
pub struct BasicRenderer {
    tag_pattern: Regex,
}

impl BasicRenderer {
    /// Create a renderer.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            tag_pattern: Regex::new(r"<(/?)([A-Za-z][\w-]*)[^>]*?(/?)>")?,
        })
    }

    fn suggest<'a>(tag: &str, names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
        names
            .map(|name| (name, levenshtein(tag, name)))
            .filter(|(_, distance)| *distance <= tag.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .min_by_key(|(_, distance)| *distance)
            .map(|(name, _)| name)
    }
}

impl TemplateRenderer for BasicRenderer {
    fn render(&self, template: &ParsedTemplate, options: &RenderOptions) -> RenderOutput {
        let mut output = RenderOutput::default();
        let mut used = BTreeSet::new();
        let mut open: Vec<String> = Vec::new();

        for captures in self.tag_pattern.captures_iter(&template.source) {
            let closing = !captures[1].is_empty();
            let self_closing = !captures[3].is_empty();
            let tag = captures[2].to_string();

            if closing {
                match open.pop() {
                    Some(expected) if expected == tag => {}
                    Some(expected) => output.errors.push(format!(
                        "tag <{expected}> is closed by </{tag}>"
                    )),
                    None => output.errors.push(format!("</{tag}> has no matching opening tag")),
                }
                continue;
            }
            if !self_closing {
                open.push(tag.clone());
            }

            let name = normalize_component_name(&tag);
            if let Some(target) = options.components.get(&name) {
                used.insert(target.target_path.clone());
            } else if name.contains('-') {
                let mut message = format!("<{tag}> is not a registered component");
                if let Some(suggestion) = Self::suggest(&name, options.components.names()) {
                    message.push_str(&format!(", did you mean <{suggestion}>?"));
                }
                output.warnings.push(message);
            }
        }
        for tag in open.iter().rev() {
            output.errors.push(format!("tag <{tag}> has no matching closing tag"));
        }
        if template.source.matches("{{").count() != template.source.matches("}}").count() {
            output.errors.push("unbalanced mustache expression".to_string());
        }

        let mut code = String::new();
        for target_path in &used {
            code.push_str(&format!("<import src=\"{target_path}\" />\n"));
        }
        if let Some(filters) = &options.filters {
            code.push_str(&options.platform.filter_include(&filters.output_path, &filters.export_name));
            code.push('\n');
        }
        code.push_str(&format!("<template name=\"{}\">\n", options.export_name));
        let body = template.source.trim();
        if !body.is_empty() {
            code.push_str(body);
            code.push('\n');
        }
        code.push_str("</template>\n");

        output.code = code;
        output
    }
}
