//! Markup generation for a unit once its record is complete.

use std::path::Path;
use std::sync::atomic::Ordering;

use anyhow::Result;

use super::BuildSession;
use crate::core::{MpError, UnitId};
use crate::host::{ParsedTemplate, RenderOptions};
use crate::store::FileRecord;

/// One markup generation request, kept for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupCall {
    /// Unit whose template is rendered
    pub unit: UnitId,
    /// The unit's template
    pub template: ParsedTemplate,
}

impl MarkupCall {
    /// Request markup generation of `unit` from `template`.
    pub fn new(unit: impl Into<UnitId>, template: ParsedTemplate) -> Self {
        Self {
            unit: unit.into(),
            template,
        }
    }
}

fn format_errors(errors: &[String]) -> String {
    let list: Vec<_> = errors.iter().map(|e| format!(" - {e}")).collect();
    format!("\n  Error compiling template:\n{}\n", list.join("\n"))
}

fn format_warnings(warnings: &[String]) -> String {
    let list: Vec<_> = warnings.iter().map(|w| format!(" - {w}")).collect();
    format!("{}\n", list.join("\n"))
}

impl BuildSession {
    /// Render a unit's markup once its components and filters are resolved,
    /// and emit it.
    ///
    /// The call is remembered so the markup can be regenerated when the global
    /// component registry changes. Template errors and warnings go to the
    /// diagnostics sink; the markup is emitted regardless.
    ///
    /// # Errors
    ///
    /// Returns [`MpError::UnitFailed`] if the unit's resolution failed, or
    /// [`MpError::WaitTimedOut`] if a wait timeout is configured and expires.
    pub async fn generate_markup(&self, call: MarkupCall) -> Result<()> {
        self.inner.replay.record_markup(call.clone());
        self.render_markup(&call).await
    }

    /// Wait until the unit's record is complete and merged against the current
    /// registry version.
    async fn await_record(&self, unit: &UnitId) -> Result<FileRecord> {
        let inner = &self.inner;
        inner
            .gate
            .await_value(&format!("record of {unit}"), || {
                let record = inner.store.get(unit)?;
                if let Some(reason) = record.failure() {
                    return Some(Err(MpError::UnitFailed {
                        unit: unit.to_string(),
                        reason: reason.to_string(),
                    }
                    .into()));
                }
                let current = inner.registry.current_version()?;
                (record.is_complete() && record.registry_version == Some(current)).then_some(Ok(record))
            })
            .await
    }

    pub(super) async fn render_markup(&self, call: &MarkupCall) -> Result<()> {
        let inner = &self.inner;
        let unit = &call.unit;
        let record = self.await_record(unit).await?;

        let options = RenderOptions {
            unit: unit.clone(),
            export_name: inner.layout.export_name(unit.path()),
            components: record.components.ready().cloned().unwrap_or_default(),
            filters: record.filters.ready().cloned().flatten(),
            platform: inner.config.platform,
        };
        let output = inner.host.renderer.render(&call.template, &options);

        if !output.errors.is_empty() {
            inner.host.diagnostics.error(unit, &format_errors(&output.errors));
        }
        if !output.warnings.is_empty() {
            inner.host.diagnostics.warning(unit, &format_warnings(&output.warnings));
        }

        // Other units still import the root component from its own file
        inner.host.output.emit(&inner.layout.markup_output(unit.path()), &output.code);
        if let Some(page) = record.page_markup.filter(|_| inner.config.platform.appends_page_markup()) {
            let content = format!("{}\n{}", output.code, page.markup);
            inner.host.output.emit(Path::new(&page.page_file_path), &content);
        }
        inner.stats.markups.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(target: "markup", "Generated markup of {unit}");
        Ok(())
    }
}
