//! Deduplicating cache of mixin filter definitions.
//!
//! Many units share the same mixins. Extracting a mixin's filters means reading
//! and analyzing the file and emitting its module, which must happen once per
//! mixin path for the whole session, even when dozens of units ask for it at the
//! same moment.
//!
//! # Concurrency
//!
//! Each path moves through two states:
//!
//! - [`MixinState::Pending`]: one task is extracting; the others wait on its `Notify`
//! - [`MixinState::Ready`]: extraction finished, the result is shared
//!
//! The first task to find the path vacant inserts `Pending` and runs the
//! extraction. A failed extraction removes the entry again and wakes the
//! waiters, one of which then retries.
//!
//! Entries are never invalidated: editing a mixin during a session does not
//! refresh its cached filters.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;

use crate::filters::FilterDefinition;

/// Cache state of one mixin path.
#[derive(Debug, Clone)]
enum MixinState {
    /// Another task is extracting this mixin.
    Pending(Arc<Notify>),
    /// Extraction finished; `None` when the mixin defines no filters.
    Ready(Option<Arc<FilterDefinition>>),
}

/// Result of [`MixinFilterCache::get_or_extract`].
#[derive(Debug, Clone)]
pub struct MixinLookup {
    /// The mixin's filters, `None` when it defines none
    pub definition: Option<Arc<FilterDefinition>>,
    /// Whether this call performed the extraction
    pub fresh: bool,
}

/// Session-wide map from resolved mixin path to its filters.
///
/// Cloning is cheap; clones share the same cache.
#[derive(Debug, Clone, Default)]
pub struct MixinFilterCache {
    entries: Arc<DashMap<PathBuf, MixinState>>,
    extractions: Arc<AtomicUsize>,
}

/// Notify handle of a pending entry, taken before the entry is replaced.
fn pending_notify(entries: &DashMap<PathBuf, MixinState>, path: &Path) -> Option<Arc<Notify>> {
    entries.get(path).and_then(|entry| match entry.value() {
        MixinState::Pending(notify) => Some(notify.clone()),
        MixinState::Ready(_) => None,
    })
}

impl MixinFilterCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached filters of `path`, running `extract` if no task has
    /// extracted them yet.
    ///
    /// Concurrent calls for the same path run `extract` once; the others wait
    /// and share its result.
    ///
    /// # Errors
    ///
    /// Returns the error of `extract` when this call ran it. Nothing is cached
    /// in that case.
    pub async fn get_or_extract<F, Fut>(&self, path: &Path, extract: F) -> Result<MixinLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<FilterDefinition>>>,
    {
        let notify = Arc::new(Notify::new());

        loop {
            match self.entries.entry(path.to_path_buf()) {
                Entry::Occupied(entry) => match entry.get() {
                    MixinState::Ready(definition) => {
                        tracing::trace!(target: "mixins", "Reusing filters of {}", path.display());
                        return Ok(MixinLookup {
                            definition: definition.clone(),
                            fresh: false,
                        });
                    }
                    MixinState::Pending(existing) => {
                        let existing = existing.clone();

                        // Create the notified future BEFORE dropping the entry so a
                        // completion landing in between still wakes us
                        let notified = existing.notified();
                        drop(entry);

                        tracing::trace!(target: "mixins", "Waiting for extraction of {}", path.display());
                        notified.await;
                    }
                },
                Entry::Vacant(entry) => {
                    entry.insert(MixinState::Pending(notify.clone()));
                    break;
                }
            }
        }

        self.extractions.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(target: "mixins", "Extracting filters of {}", path.display());

        match extract().await {
            Ok(definition) => {
                let definition = definition.filter(|d| !d.is_empty()).map(Arc::new);
                let to_wake = pending_notify(&self.entries, path);
                self.entries.insert(path.to_path_buf(), MixinState::Ready(definition.clone()));
                if let Some(waiters) = to_wake {
                    waiters.notify_waiters();
                }
                Ok(MixinLookup {
                    definition,
                    fresh: true,
                })
            }
            Err(e) => {
                let to_wake = pending_notify(&self.entries, path);
                self.entries.remove(path);
                if let Some(waiters) = to_wake {
                    waiters.notify_waiters();
                }
                Err(e)
            }
        }
    }

    /// Cached filters of `path`: `None` if not extracted yet, `Some(None)` if
    /// the mixin defines no filters.
    pub fn get(&self, path: &Path) -> Option<Option<Arc<FilterDefinition>>> {
        self.entries.get(path).and_then(|entry| match entry.value() {
            MixinState::Ready(definition) => Some(definition.clone()),
            MixinState::Pending(_) => None,
        })
    }

    /// How many extractions have been started over the cache's lifetime.
    pub fn extraction_count(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    /// Number of cached mixins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
