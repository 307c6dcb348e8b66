//! Filter fork: mixin filters and the unit's own filters merged into one module.

use std::path::Path;
use std::sync::atomic::Ordering;

use anyhow::Result;

use super::BuildSession;
use crate::core::UnitId;
use crate::filters::{self, FilterDefinition, MixinImport};
use crate::store::{FilterDescriptor, RecordPatch, Slot};

impl BuildSession {
    pub(super) async fn resolve_filters(
        self,
        unit: UnitId,
        mixins: Vec<String>,
        local: Option<FilterDefinition>,
    ) {
        let descriptor = self.combine_filters(&unit, &mixins, local.as_ref()).await;
        self.inner.store.upsert(&unit, RecordPatch::new().filters(Slot::Ready(descriptor)));
    }

    async fn combine_filters(
        &self,
        unit: &UnitId,
        mixins: &[String],
        local: Option<&FilterDefinition>,
    ) -> Option<FilterDescriptor> {
        let inner = &self.inner;
        let context = unit.context();

        let loaded =
            futures::future::join_all(mixins.iter().map(|reference| self.load_mixin(context, reference))).await;

        let mut imports = Vec::new();
        for (reference, result) in mixins.iter().zip(loaded) {
            match result {
                Ok(Some(import)) => imports.push(import),
                Ok(None) => {}
                Err(e) => tracing::warn!(target: "filters", "{unit}: skipping mixin {reference}: {e:#}"),
            }
        }

        let output = inner.layout.filter_output(unit.path());
        let syntax = inner.config.platform.module_syntax();
        let code = filters::combine(local, &imports, &output.file_path, syntax)?;

        inner.host.output.emit(&output.file_path, &code);
        inner.stats.filter_modules.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(target: "filters", "{unit}: emitted {}", output.file_path.display());

        let file_name = output.file_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Some(FilterDescriptor {
            output_path: format!("./{file_name}"),
            export_name: output.module_name,
        })
    }

    /// Resolve a mixin and fetch its filters through the cache. The extracting
    /// call also emits the mixin's own module.
    async fn load_mixin(&self, context: &Path, reference: &str) -> Result<Option<MixinImport>> {
        let inner = &self.inner;
        let path = inner.host.resolver.resolve(context, reference).await?;
        let lookup = inner.mixins.get_or_extract(&path, || inner.host.extract_file_filters(&path)).await?;
        let output = inner.layout.filter_output(&path);

        if lookup.fresh {
            if let Some(definition) = &lookup.definition {
                let code = filters::render_module(definition, inner.config.platform.module_syntax());
                inner.host.output.emit(&output.file_path, &code);
                inner.stats.filter_modules.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(target: "filters", "Emitted mixin module {}", output.file_path.display());
            }
        }

        Ok(lookup.definition.map(|definition| MixinImport {
            output_path: output.file_path,
            definition,
        }))
    }
}
