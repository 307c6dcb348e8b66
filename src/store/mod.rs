//! Per-unit record store.
//!
//! The store holds one [`FileRecord`] per compiled unit. Writers merge partial
//! updates ([`RecordPatch`]) into the existing record; readers take snapshot
//! clones. Every write signals the [`ReadinessGate`] so consumers blocked on a
//! record re-check immediately.
//!
//! # Slot semantics
//!
//! Fields produced by a resolution fork are [`Slot`]s. A compilation pass resets
//! them to [`Slot::Pending`], and the fork replaces them wholesale with
//! [`Slot::Ready`] (or [`Slot::Failed`]) once its result is complete. A reader
//! never sees a half-merged component map: the map is built privately and
//! published in a single upsert.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::core::{PageType, UnitId};
use crate::gate::ReadinessGate;

/// A value produced asynchronously by a resolution fork.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Slot<T> {
    /// The fork has not finished yet.
    #[default]
    Pending,
    /// The fork completed with this value.
    Ready(T),
    /// The fork could not complete; the string says why.
    Failed(String),
}

impl<T> Slot<T> {
    /// Whether the fork has completed successfully.
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Whether the fork is still running.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The completed value, if any.
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Where a component used by a unit lives in the output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComponentTarget {
    /// Output path of the component's markup, rooted at the output directory
    /// (e.g. `/components/header.wxml`)
    pub target_path: String,
    /// Name of the template exported by that markup
    pub export_name: String,
}

/// Components available to a unit, keyed by kebab-case usage name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ComponentMap(BTreeMap<String, ComponentTarget>);

impl ComponentMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a component.
    pub fn insert(&mut self, name: impl Into<String>, target: ComponentTarget) {
        self.0.insert(name.into(), target);
    }

    /// Look up a component by usage name.
    pub fn get(&self, name: &str) -> Option<&ComponentTarget> {
        self.0.get(name)
    }

    /// Whether a component with this usage name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate components in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ComponentTarget)> {
        self.0.iter()
    }

    /// Usage names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `local` on top of `base`; local entries win on name collision.
    #[must_use]
    pub fn merged(base: &Self, local: &Self) -> Self {
        let mut merged = base.clone();
        merged.0.extend(local.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

impl FromIterator<(String, ComponentTarget)> for ComponentMap {
    fn from_iter<I: IntoIterator<Item = (String, ComponentTarget)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Where a unit's merged filter module was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDescriptor {
    /// Path of the filter module relative to the unit's markup (e.g. `./index.wxs`)
    pub output_path: String,
    /// Module name the markup imports it under
    pub export_name: String,
}

/// Page markup parked on a root component's record, for platforms that append
/// the page markup to the component's own output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMarkup {
    /// Output path of the page markup file
    pub page_file_path: String,
    /// Page markup to append after the component markup
    pub markup: String,
}

/// Everything known about one compiled unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FileRecord {
    /// Role of the unit; `None` until the unit has been analyzed.
    pub page_type: Option<PageType>,
    /// Module id assigned by the host.
    pub module_id: Option<String>,
    /// Resolved components (global base overlaid with local declarations).
    pub components: Slot<ComponentMap>,
    /// Merged filter module; `Ready(None)` when the unit has no filters.
    pub filters: Slot<Option<FilterDescriptor>>,
    /// Registry version `components` was merged against.
    pub registry_version: Option<u64>,
    /// Page markup to append to this unit's output, if any.
    pub page_markup: Option<PageMarkup>,
}

impl FileRecord {
    /// Whether both forks completed and the unit has been classified.
    pub fn is_complete(&self) -> bool {
        self.page_type.is_some() && self.components.is_ready() && self.filters.is_ready()
    }

    /// The first fork failure recorded on this unit, if any.
    pub fn failure(&self) -> Option<&str> {
        match (&self.components, &self.filters) {
            (Slot::Failed(reason), _) | (_, Slot::Failed(reason)) => Some(reason.as_str()),
            _ => None,
        }
    }
}

/// Partial update of a [`FileRecord`]; `None` fields leave the record untouched.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    page_type: Option<PageType>,
    module_id: Option<String>,
    components: Option<Slot<ComponentMap>>,
    filters: Option<Slot<Option<FilterDescriptor>>>,
    registry_version: Option<u64>,
    page_markup: Option<PageMarkup>,
}

impl RecordPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page type.
    #[must_use]
    pub fn page_type(mut self, page_type: PageType) -> Self {
        self.page_type = Some(page_type);
        self
    }

    /// Set the module id.
    #[must_use]
    pub fn module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    /// Replace the components slot.
    #[must_use]
    pub fn components(mut self, components: Slot<ComponentMap>) -> Self {
        self.components = Some(components);
        self
    }

    /// Replace the filters slot.
    #[must_use]
    pub fn filters(mut self, filters: Slot<Option<FilterDescriptor>>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Set the registry version the components were merged against.
    #[must_use]
    pub fn registry_version(mut self, version: u64) -> Self {
        self.registry_version = Some(version);
        self
    }

    /// Park page markup on the record.
    #[must_use]
    pub fn page_markup(mut self, page_markup: PageMarkup) -> Self {
        self.page_markup = Some(page_markup);
        self
    }

    fn apply(self, record: &mut FileRecord) {
        if let Some(page_type) = self.page_type {
            record.page_type = Some(page_type);
        }
        if let Some(module_id) = self.module_id {
            record.module_id = Some(module_id);
        }
        if let Some(components) = self.components {
            record.components = components;
        }
        if let Some(filters) = self.filters {
            record.filters = filters;
        }
        if let Some(version) = self.registry_version {
            record.registry_version = Some(version);
        }
        if let Some(page_markup) = self.page_markup {
            record.page_markup = Some(page_markup);
        }
    }
}

/// Shared table of [`FileRecord`]s keyed by [`UnitId`].
///
/// Cloning is cheap; clones share the same table.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    records: Arc<DashMap<UnitId, FileRecord>>,
    gate: ReadinessGate,
}

impl FileRecordStore {
    /// Create an empty store that signals `gate` on every write.
    pub fn new(gate: ReadinessGate) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            gate,
        }
    }

    /// Merge `patch` into the unit's record, creating the record if absent.
    pub fn upsert(&self, unit: &UnitId, patch: RecordPatch) {
        {
            let mut record = self.records.entry(unit.clone()).or_default();
            patch.apply(record.value_mut());
            tracing::trace!(target: "store", "Updated record of {unit}");
        }
        // Shard lock released before waking readers
        self.gate.signal();
    }

    /// Snapshot of the unit's record.
    pub fn get(&self, unit: &UnitId) -> Option<FileRecord> {
        self.records.get(unit).map(|entry| entry.value().clone())
    }

    /// Identities of all stored records, sorted.
    pub fn units(&self) -> Vec<UnitId> {
        let mut units: Vec<_> = self.records.iter().map(|entry| entry.key().clone()).collect();
        units.sort();
        units
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
