//! Compiling entries and unit scripts.

use anyhow::Result;
use serde::Serialize;

use super::{BuildSession, ResolutionHandle};
use crate::core::{PageType, UnitId};
use crate::layout::{page_instance, page_markup};
use crate::registry::{CommitOutcome, GlobalComponentRegistry};
use crate::store::{PageMarkup, RecordPatch, Slot};
use crate::utils::fs::to_slash;

/// What compiling an entry did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    /// Role of the entry
    pub page_type: PageType,
    /// Registry commit, for the application entry
    pub commit: Option<CommitOutcome>,
    /// Units refreshed because the registry changed
    pub replayed: usize,
    /// Whether page markup was produced
    pub page_markup: bool,
}

impl BuildSession {
    /// Compile an application or page entry.
    ///
    /// The application entry rebuilds the global component registry; when the
    /// rebuild changes it, stale units are refreshed before this returns. A
    /// page entry with a root component gets its page markup.
    ///
    /// The entry is analyzed before anything else, so an entry that fails to
    /// analyze leaves the current registry untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::MpError::Analysis`] if the entry cannot be analyzed.
    pub async fn compile_entry(&self, entry: impl Into<UnitId>, source: &str) -> Result<EntryOutcome> {
        let entry = entry.into();
        let inner = &self.inner;
        let page_type = inner.config.classify(entry.path());
        let metadata = inner.host.analyzer.analyze(entry.path(), source)?;

        let mut outcome = EntryOutcome {
            page_type,
            commit: None,
            replayed: 0,
            page_markup: false,
        };

        if page_type == PageType::App {
            let ticket = inner.registry.begin_rebuild();
            let components = GlobalComponentRegistry::resolve_global_sources(
                &inner.host,
                &inner.layout,
                entry.path(),
                &metadata.global_components,
                &metadata.imports,
            )
            .await;
            let commit = inner.registry.commit(ticket, components);

            if commit.changed && commit.had_previous && !commit.superseded {
                outcome.replayed = self.invalidate(commit.version).await;
            }
            outcome.commit = Some(commit);
        }

        if page_type == PageType::Page {
            if let Some(root) = &metadata.root_component {
                match inner.host.resolver.resolve(entry.context(), root).await {
                    Ok(root_path) => {
                        self.create_page_markup(&entry, UnitId::new(root_path)).await;
                        outcome.page_markup = true;
                    }
                    Err(e) => tracing::warn!("Skipping page markup of {entry}: {e:#}"),
                }
            }
        }

        Ok(outcome)
    }

    async fn create_page_markup(&self, entry: &UnitId, root: UnitId) {
        let inner = &self.inner;
        let target = inner.layout.component_target(root.path());
        let page_file = inner.layout.markup_output(entry.path());

        if !inner.config.platform.appends_page_markup() {
            inner.host.output.emit(&page_file, &page_markup(&target));
            return;
        }

        // The root component's markup carries the page markup, so the root
        // template is defined in the page file itself
        inner.store.upsert(
            &root,
            RecordPatch::new().page_markup(PageMarkup {
                page_file_path: to_slash(&page_file),
                markup: page_instance(&target),
            }),
        );
        if let Some(call) = inner.replay.markup_call(&root) {
            if let Err(e) = self.render_markup(&call).await {
                tracing::warn!(target: "markup", "Could not regenerate {root}: {e:#}");
            }
        }
    }

    /// Analyze a unit's script and start resolving its dependencies.
    ///
    /// Both resolution slots of the unit's record are reset to pending and two
    /// forks are spawned, one for components and one for filters. They run to
    /// completion whether or not the returned handle is awaited. Must be called
    /// from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::MpError::Analysis`] if the script cannot be
    /// analyzed. Both slots are then marked failed, so anyone waiting for the
    /// unit's markup gets an error instead of waiting forever.
    pub fn compile_script(
        &self,
        unit: impl Into<UnitId>,
        source: &str,
        module_id: &str,
    ) -> Result<ResolutionHandle> {
        let unit = unit.into();
        let inner = &self.inner;
        let page_type = inner.config.classify(unit.path());

        let metadata = match inner.host.analyzer.analyze(unit.path(), source) {
            Ok(metadata) => metadata,
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!("Analysis of {unit} failed: {reason}");
                inner.store.upsert(
                    &unit,
                    RecordPatch::new()
                        .page_type(page_type)
                        .module_id(module_id)
                        .components(Slot::Failed(reason.clone()))
                        .filters(Slot::Failed(reason)),
                );
                inner.replay.forget_components(&unit);
                return Err(e);
            }
        };

        inner.store.upsert(
            &unit,
            RecordPatch::new()
                .page_type(page_type)
                .module_id(module_id)
                .components(Slot::Pending)
                .filters(Slot::Pending),
        );
        tracing::debug!("Resolving {unit} ({page_type})");

        let components = tokio::spawn(self.clone().resolve_components(unit.clone(), metadata.components));
        let filters =
            tokio::spawn(self.clone().resolve_filters(unit.clone(), metadata.mixins, metadata.filters));

        Ok(ResolutionHandle {
            unit,
            components,
            filters,
        })
    }
}
