//! Build session: the resolution orchestrator.
//!
//! A [`BuildSession`] owns every piece of cross-unit state of one compilation
//! session (record store, global component registry, mixin cache, replay
//! records) and drives the per-unit workflow:
//!
//! 1. [`BuildSession::compile_entry`] compiles the application entry, rebuilding
//!    the global component registry, and page entries, producing page markup.
//! 2. [`BuildSession::compile_script`] analyzes a unit and spawns two forks: one
//!    resolves its components against the registry, the other resolves its
//!    filters through the mixin cache.
//! 3. [`BuildSession::generate_markup`] waits until both forks completed and
//!    renders the unit's markup.
//!
//! When a rebuild of the application entry changes the registry, every unit
//! whose components were merged against an older version has its components
//! re-merged and its markup regenerated.
//!
//! Units are compiled concurrently by the host; the session itself imposes no
//! ordering between them. Handles are cheap to clone and all clones share state.
//!
//! # Example
//!
//! ```rust,no_run
//! use mpdeps::config::BuildConfig;
//! use mpdeps::host::{Host, ParsedTemplate};
//! use mpdeps::session::{BuildSession, MarkupCall};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = BuildConfig::load_from(Path::new("mpdeps.toml")).await?;
//! let session = BuildSession::new(config.clone(), Host::for_config(&config)?);
//!
//! let entry = config.project_root.join("src/main.js");
//! session.compile_entry(&entry, &std::fs::read_to_string(&entry)?).await?;
//!
//! let unit = config.project_root.join("src/pages/index/index.vue");
//! let source = std::fs::read_to_string(&unit)?;
//! session.compile_script(&unit, &source, "data-v-1")?;
//! session.generate_markup(MarkupCall::new(&unit, ParsedTemplate::new("<view />"))).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::BuildConfig;
use crate::core::{MpError, UnitId};
use crate::gate::ReadinessGate;
use crate::host::Host;
use crate::layout::OutputLayout;
use crate::mixins::MixinFilterCache;
use crate::registry::GlobalComponentRegistry;
use crate::store::FileRecordStore;

mod components;
mod entry;
mod filters;
mod markup;
mod replay;

pub use entry::EntryOutcome;
pub use markup::MarkupCall;
pub use replay::{ComponentResolutionCall, ReplayRecords};

#[derive(Debug, Default)]
struct SessionStats {
    filter_modules: AtomicUsize,
    markups: AtomicUsize,
}

struct SessionInner {
    config: BuildConfig,
    layout: OutputLayout,
    host: Host,
    gate: ReadinessGate,
    store: FileRecordStore,
    registry: GlobalComponentRegistry,
    mixins: MixinFilterCache,
    replay: ReplayRecords,
    stats: SessionStats,
}

/// Handle on one compilation session.
#[derive(Clone)]
pub struct BuildSession {
    inner: Arc<SessionInner>,
}

impl BuildSession {
    /// Create a session for a project. `config` paths must already be absolute
    /// (see [`BuildConfig::resolve_paths`]).
    pub fn new(config: BuildConfig, host: Host) -> Self {
        let gate = ReadinessGate::new(config.readiness.poll_interval(), config.readiness.timeout());
        Self {
            inner: Arc::new(SessionInner {
                layout: OutputLayout::new(&config),
                store: FileRecordStore::new(gate.clone()),
                registry: GlobalComponentRegistry::new(gate.clone()),
                mixins: MixinFilterCache::new(),
                replay: ReplayRecords::default(),
                stats: SessionStats::default(),
                config,
                host,
                gate,
            }),
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.inner.config
    }

    /// Output layout derived from the configuration.
    pub fn layout(&self) -> &OutputLayout {
        &self.inner.layout
    }

    /// Per-unit records.
    pub fn store(&self) -> &FileRecordStore {
        &self.inner.store
    }

    /// Global component registry.
    pub fn registry(&self) -> &GlobalComponentRegistry {
        &self.inner.registry
    }

    /// Mixin filter cache.
    pub fn mixins(&self) -> &MixinFilterCache {
        &self.inner.mixins
    }

    /// Readiness gate shared by the store and the registry.
    pub fn gate(&self) -> &ReadinessGate {
        &self.inner.gate
    }

    /// Replay records.
    pub fn replay_records(&self) -> &ReplayRecords {
        &self.inner.replay
    }

    /// Commit an empty global registry, for projects without an application entry.
    ///
    /// Component resolution waits for a registry snapshot; without an
    /// application entry nothing would ever publish one.
    pub fn without_global_components(&self) {
        let ticket = self.inner.registry.begin_rebuild();
        self.inner.registry.commit(ticket, crate::store::ComponentMap::new());
    }

    /// Counters and failures of the session so far.
    pub fn summary(&self) -> BuildSummary {
        let store = &self.inner.store;
        let mut complete = 0;
        let mut failed = Vec::new();
        for unit in store.units() {
            let Some(record) = store.get(&unit) else {
                continue;
            };
            if let Some(reason) = record.failure() {
                failed.push(FailedUnit {
                    unit: unit.to_string(),
                    reason: reason.to_string(),
                });
            } else if record.is_complete() {
                complete += 1;
            }
        }

        let snapshot = self.inner.registry.snapshot();
        let stats = &self.inner.stats;
        BuildSummary {
            platform: self.inner.config.platform.to_string(),
            units: store.len(),
            complete,
            failed,
            registry_version: snapshot.as_ref().map(|s| s.version),
            global_components: snapshot.map_or(0, |s| s.components.len()),
            mixins_extracted: self.inner.mixins.extraction_count(),
            filter_modules: stats.filter_modules.load(Ordering::SeqCst),
            markups: stats.markups.load(Ordering::SeqCst),
            replayed: self.inner.replay.refreshed_count(),
        }
    }
}

/// A unit whose resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUnit {
    /// Unit path
    pub unit: String,
    /// Recorded failure
    pub reason: String,
}

/// Snapshot of what a session has done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    /// Target platform
    pub platform: String,
    /// Units with a record
    pub units: usize,
    /// Units whose record is complete
    pub complete: usize,
    /// Units whose resolution failed
    pub failed: Vec<FailedUnit>,
    /// Current registry version, if the registry is readable
    pub registry_version: Option<u64>,
    /// Number of global components
    pub global_components: usize,
    /// Mixins whose filters were extracted
    pub mixins_extracted: usize,
    /// Filter modules emitted for units and mixins
    pub filter_modules: usize,
    /// Markup generations, replays included
    pub markups: usize,
    /// Distinct units whose markup was refreshed after a registry change
    pub replayed: usize,
}

/// The two forks spawned by [`BuildSession::compile_script`].
///
/// Dropping the handle detaches the forks; they still run to completion.
#[derive(Debug)]
pub struct ResolutionHandle {
    unit: UnitId,
    components: JoinHandle<()>,
    filters: JoinHandle<()>,
}

impl ResolutionHandle {
    /// The unit being resolved.
    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    /// Wait for both forks to finish.
    ///
    /// A fork that fails records the failure on the unit's record and still
    /// finishes normally; this only errors if a fork task panicked.
    pub async fn wait(self) -> Result<()> {
        let (components, filters) = tokio::join!(self.components, self.filters);
        for (fork, result) in [("component", components), ("filter", filters)] {
            result.map_err(|e| MpError::Other {
                message: format!("{fork} resolution of {} aborted: {e}", self.unit),
            })?;
        }
        Ok(())
    }
}
