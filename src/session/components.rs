//! Component fork: local components merged over the global registry.

use anyhow::Result;
use indexmap::IndexMap;

use super::BuildSession;
use super::replay::ComponentResolutionCall;
use crate::core::UnitId;
use crate::layout::normalize_component_name;
use crate::registry::RegistrySnapshot;
use crate::store::{ComponentMap, FileRecordStore, RecordPatch, Slot};

/// Publish `local` overlaid on `snapshot` as the unit's components.
pub(super) fn merge_components(
    store: &FileRecordStore,
    unit: &UnitId,
    local: &ComponentMap,
    snapshot: &RegistrySnapshot,
) {
    let merged = ComponentMap::merged(&snapshot.components, local);
    tracing::trace!(
        target: "resolve",
        "{unit}: {} components against registry version {}",
        merged.len(),
        snapshot.version
    );
    store.upsert(unit, RecordPatch::new().components(Slot::Ready(merged)).registry_version(snapshot.version));
}

impl BuildSession {
    pub(super) async fn resolve_components(self, unit: UnitId, declared: IndexMap<String, String>) {
        if let Err(e) = self.try_resolve_components(&unit, &declared).await {
            let reason = format!("{e:#}");
            tracing::warn!(target: "resolve", "Component resolution of {unit} failed: {reason}");
            self.inner.store.upsert(&unit, RecordPatch::new().components(Slot::Failed(reason)));
        }
    }

    async fn try_resolve_components(&self, unit: &UnitId, declared: &IndexMap<String, String>) -> Result<()> {
        let inner = &self.inner;
        let context = unit.context();

        let resolved = futures::future::join_all(
            declared.values().map(|reference| inner.host.resolver.resolve(context, reference)),
        )
        .await;

        let mut local = ComponentMap::new();
        for ((name, reference), result) in declared.iter().zip(resolved) {
            match result {
                Ok(path) => local.insert(normalize_component_name(name), inner.layout.component_target(&path)),
                Err(e) => {
                    tracing::warn!(target: "resolve", "{unit}: skipping component {name} ({reference}): {e:#}");
                }
            }
        }

        inner.replay.record_components(
            unit.clone(),
            ComponentResolutionCall {
                local: local.clone(),
            },
        );

        // A rebuild committing between the snapshot read and the upsert would
        // leave this unit behind, so merge until the versions agree
        loop {
            let snapshot = inner
                .gate
                .await_value("global components", || inner.registry.snapshot().map(Ok))
                .await?;
            merge_components(&inner.store, unit, &local, &snapshot);

            if inner.registry.current_version() == Some(snapshot.version) {
                return Ok(());
            }
        }
    }
}
