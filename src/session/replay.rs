//! Invalidation and replay after a global registry change.
//!
//! Every unit remembers two calls: the last component resolution (its locally
//! resolved components) and the last markup generation (its template). When a
//! rebuild of the application entry commits a changed registry, the units whose
//! components were merged against an older version are stale. Their components
//! are re-merged from the remembered local map, then their markup is generated
//! again from the remembered template. Both passes follow the order in which
//! units were first recorded.

use std::collections::HashSet;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::BuildSession;
use super::components::merge_components;
use super::markup::MarkupCall;
use crate::core::UnitId;
use crate::store::ComponentMap;

/// Remembered component resolution of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentResolutionCall {
    /// Components the unit declares itself, already resolved
    pub local: ComponentMap,
}

/// Last recorded calls per unit, in first-recorded order.
#[derive(Debug, Default)]
pub struct ReplayRecords {
    components: Mutex<IndexMap<UnitId, ComponentResolutionCall>>,
    markups: Mutex<IndexMap<UnitId, MarkupCall>>,
    refreshed: Mutex<HashSet<UnitId>>,
}

impl ReplayRecords {
    /// Remember the component resolution of `unit`, replacing an earlier one.
    pub fn record_components(&self, unit: UnitId, call: ComponentResolutionCall) {
        self.components.lock().insert(unit, call);
    }

    /// Forget the component resolution of `unit`.
    pub fn forget_components(&self, unit: &UnitId) {
        self.components.lock().shift_remove(unit);
    }

    /// Remember a markup generation, replacing an earlier one for the same unit.
    pub fn record_markup(&self, call: MarkupCall) {
        self.markups.lock().insert(call.unit.clone(), call);
    }

    /// Last component resolution of `unit`.
    pub fn component_call(&self, unit: &UnitId) -> Option<ComponentResolutionCall> {
        self.components.lock().get(unit).cloned()
    }

    /// Last markup generation of `unit`.
    pub fn markup_call(&self, unit: &UnitId) -> Option<MarkupCall> {
        self.markups.lock().get(unit).cloned()
    }

    /// Units with a remembered markup generation, in order.
    pub fn markup_units(&self) -> Vec<UnitId> {
        self.markups.lock().keys().cloned().collect()
    }

    /// Distinct units refreshed after a registry change so far.
    pub fn refreshed_count(&self) -> usize {
        self.refreshed.lock().len()
    }

    fn component_calls(&self) -> Vec<(UnitId, ComponentResolutionCall)> {
        self.components.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn markup_calls(&self) -> Vec<MarkupCall> {
        self.markups.lock().values().cloned().collect()
    }
}

impl BuildSession {
    /// Refresh every unit merged against a registry version older than the
    /// current one. Returns the number of units refreshed.
    ///
    /// Only units whose components are resolved take part. Units still in
    /// flight merge against the current registry on their own, and a failed
    /// slot stays failed until the unit is compiled again.
    pub async fn invalidate(&self, version: u64) -> usize {
        let inner = &self.inner;
        let Some(snapshot) = inner.registry.snapshot() else {
            return 0;
        };
        if snapshot.version != version {
            tracing::debug!(target: "replay", "Registry moved from {version} to {}", snapshot.version);
        }

        let stale: HashSet<UnitId> = inner
            .store
            .units()
            .into_iter()
            .filter(|unit| {
                inner.store.get(unit).is_some_and(|record| {
                    record.components.is_ready()
                        && record.registry_version.is_some_and(|v| v < snapshot.version)
                })
            })
            .collect();
        if stale.is_empty() {
            return 0;
        }
        tracing::info!(
            target: "replay",
            "Global components changed (version {}), refreshing {} units",
            snapshot.version,
            stale.len()
        );

        for (unit, call) in inner.replay.component_calls() {
            if stale.contains(&unit) {
                merge_components(&inner.store, &unit, &call.local, &snapshot);
            }
        }

        let mut refreshed = stale;
        let calls: Vec<_> =
            inner.replay.markup_calls().into_iter().filter(|call| refreshed.contains(&call.unit)).collect();
        let results = futures::future::join_all(calls.iter().map(|call| self.render_markup(call))).await;
        for (call, result) in calls.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(target: "replay", "Could not regenerate {}: {e:#}", call.unit);
                refreshed.remove(&call.unit);
            }
        }

        let count = refreshed.len();
        inner.replay.refreshed.lock().extend(refreshed);
        count
    }
}
