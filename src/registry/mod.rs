//! Global component registry.
//!
//! Components registered globally by the application entry are available to
//! every unit without a local declaration. The registry is rebuilt whenever
//! the entry is compiled, and every unit's component map is merged against a
//! specific registry version.
//!
//! # States
//!
//! ```text
//!            begin_rebuild            commit
//!   Empty ─────────────────▶ Building ───────▶ Ready(v1)
//!                               ▲                 │
//!                               └─────────────────┘
//!                                 begin_rebuild (keeps v1 as previous)
//! ```
//!
//! Readers only ever see a `Ready` snapshot; while a rebuild is in flight they
//! wait on the [`ReadinessGate`]. The version starts at 1 and is bumped only
//! when a commit changes the map, which is what triggers a replay of stale units.
//!
//! # Overlapping rebuilds
//!
//! Every [`GlobalComponentRegistry::begin_rebuild`] hands out a ticket. Only the
//! latest ticket may commit; a commit with an older ticket is discarded and
//! reported as superseded, so a slow rebuild cannot overwrite a newer one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use parking_lot::Mutex;
use serde::Serialize;

use crate::gate::ReadinessGate;
use crate::host::Host;
use crate::layout::{OutputLayout, normalize_component_name};
use crate::store::ComponentMap;

/// An immutable view of the registry at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Global components by kebab-case name
    pub components: Arc<ComponentMap>,
    /// Version of this snapshot, starting at 1
    pub version: u64,
}

#[derive(Debug)]
enum RegistryState {
    Empty,
    Building { previous: Option<RegistrySnapshot> },
    Ready { current: RegistrySnapshot },
}

/// Permission to commit the rebuild started by [`GlobalComponentRegistry::begin_rebuild`].
#[derive(Debug, PartialEq, Eq)]
pub struct RebuildTicket {
    id: u64,
}

/// What a commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    /// The committed map differs from the previous one
    pub changed: bool,
    /// Registry version after the commit (0 if nothing was ever committed)
    pub version: u64,
    /// A previous snapshot existed
    pub had_previous: bool,
    /// The ticket was outdated; nothing was committed
    pub superseded: bool,
}

#[derive(Debug)]
struct Inner {
    state: RegistryState,
    latest_ticket: u64,
}

/// The session's registry of globally registered components.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Debug, Clone)]
pub struct GlobalComponentRegistry {
    inner: Arc<Mutex<Inner>>,
    gate: ReadinessGate,
}

impl GlobalComponentRegistry {
    /// Create an empty registry that signals `gate` on every commit.
    pub fn new(gate: ReadinessGate) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: RegistryState::Empty,
                latest_ticket: 0,
            })),
            gate,
        }
    }

    /// Start a rebuild. Readers wait until the matching commit.
    pub fn begin_rebuild(&self) -> RebuildTicket {
        let mut inner = self.inner.lock();
        inner.latest_ticket += 1;
        let previous = match std::mem::replace(&mut inner.state, RegistryState::Empty) {
            RegistryState::Empty => None,
            RegistryState::Building {
                previous,
            } => previous,
            RegistryState::Ready {
                current,
            } => Some(current),
        };
        inner.state = RegistryState::Building {
            previous,
        };
        tracing::debug!(target: "registry", "Rebuild {} started", inner.latest_ticket);
        RebuildTicket {
            id: inner.latest_ticket,
        }
    }

    /// Publish the rebuilt map.
    ///
    /// The version is bumped only when `components` differs from the previous
    /// snapshot. Outdated tickets commit nothing.
    pub fn commit(&self, ticket: RebuildTicket, components: ComponentMap) -> CommitOutcome {
        let outcome = {
            let mut inner = self.inner.lock();
            let previous = match &inner.state {
                RegistryState::Empty => None,
                RegistryState::Building {
                    previous,
                } => previous.clone(),
                RegistryState::Ready {
                    current,
                } => Some(current.clone()),
            };
            let had_previous = previous.is_some();

            if ticket.id != inner.latest_ticket {
                tracing::debug!(
                    target: "registry",
                    "Rebuild {} superseded by rebuild {}",
                    ticket.id,
                    inner.latest_ticket
                );
                return CommitOutcome {
                    changed: false,
                    version: previous.map_or(0, |p| p.version),
                    had_previous,
                    superseded: true,
                };
            }

            let (current, changed) = match previous {
                Some(previous) if *previous.components == components => (previous, false),
                Some(previous) => (
                    RegistrySnapshot {
                        components: Arc::new(components),
                        version: previous.version + 1,
                    },
                    true,
                ),
                None => (
                    RegistrySnapshot {
                        components: Arc::new(components),
                        version: 1,
                    },
                    true,
                ),
            };
            let outcome = CommitOutcome {
                changed,
                version: current.version,
                had_previous,
                superseded: false,
            };
            tracing::debug!(
                target: "registry",
                "Committed {} global components at version {} (changed: {changed})",
                current.components.len(),
                current.version
            );
            inner.state = RegistryState::Ready {
                current,
            };
            outcome
        };
        self.gate.signal();
        outcome
    }

    /// The current snapshot, unless the registry is empty or rebuilding.
    pub fn snapshot(&self) -> Option<RegistrySnapshot> {
        match &self.inner.lock().state {
            RegistryState::Ready {
                current,
            } => Some(current.clone()),
            _ => None,
        }
    }

    /// Version of the current snapshot, unless the registry is empty or rebuilding.
    pub fn current_version(&self) -> Option<u64> {
        self.snapshot().map(|s| s.version)
    }

    /// Whether a snapshot is readable.
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.lock().state, RegistryState::Ready { .. })
    }

    /// Collect the global components of an application entry.
    ///
    /// `declared` are the entry's own registrations. The entry's imports are
    /// followed breadth-first in declaration order, each file analyzed once;
    /// registrations found there are added unless the name is already taken.
    /// Every registration is then resolved, against the directory of the
    /// module that made it, to its output target.
    ///
    /// Unresolvable references and unreadable files are logged and skipped.
    pub async fn resolve_global_sources(
        host: &Host,
        layout: &OutputLayout,
        entry: &Path,
        declared: &IndexMap<String, String>,
        imports: &IndexMap<String, String>,
    ) -> ComponentMap {
        let entry_dir = entry.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut registrations: IndexMap<String, (PathBuf, String)> = IndexMap::new();
        let mut register = |context: &Path, name: &str, reference: &str| {
            if let Entry::Vacant(slot) = registrations.entry(normalize_component_name(name)) {
                slot.insert((context.to_path_buf(), reference.to_string()));
            } else {
                tracing::debug!(target: "registry", "Ignoring later registration of {name}");
            }
        };
        for (name, reference) in declared {
            register(&entry_dir, name, reference);
        }

        let mut visited: HashSet<PathBuf> = HashSet::from([entry.to_path_buf()]);
        let mut frontier: Vec<(PathBuf, String)> =
            imports.values().map(|reference| (entry_dir.clone(), reference.clone())).collect();

        while !frontier.is_empty() {
            let resolved = futures::future::join_all(
                frontier.iter().map(|(context, reference)| host.resolver.resolve(context, reference)),
            )
            .await;

            let mut files = Vec::new();
            for (result, (_, reference)) in resolved.into_iter().zip(&frontier) {
                match result {
                    Ok(path) => {
                        if visited.insert(path.clone()) {
                            files.push(path);
                        }
                    }
                    Err(e) => tracing::warn!(target: "registry", "Skipping import {reference}: {e:#}"),
                }
            }

            let analyzed =
                futures::future::join_all(files.iter().map(|path| host.analyze_file(path))).await;

            let mut next = Vec::new();
            for (result, path) in analyzed.into_iter().zip(&files) {
                match result {
                    Ok(metadata) => {
                        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                        for (name, reference) in &metadata.global_components {
                            register(&dir, name, reference);
                        }
                        next.extend(metadata.imports.into_values().map(|r| (dir.clone(), r)));
                    }
                    Err(e) => tracing::warn!(target: "registry", "Skipping {}: {e:#}", path.display()),
                }
            }
            frontier = next;
        }

        let resolved = futures::future::join_all(
            registrations
                .iter()
                .map(|(_, (context, reference))| host.resolver.resolve(context, reference)),
        )
        .await;

        let mut components = ComponentMap::new();
        for (result, (name, (_, reference))) in resolved.into_iter().zip(&registrations) {
            match result {
                Ok(path) => components.insert(name.clone(), layout.component_target(&path)),
                Err(e) => {
                    tracing::warn!(target: "registry", "Skipping global component {name} ({reference}): {e:#}");
                }
            }
        }
        components
    }
}
