//! mpdeps - incremental dependency resolution for mini-program compilers
//!
//! A compiler that turns single-file components into mini-program packages
//! compiles every unit independently and concurrently. Each unit's markup still
//! depends on state that spans the whole project: which components it may use
//! (its own declarations plus the globally registered ones) and which filter
//! functions it can call (its own plus those inherited from mixins). This crate
//! is the layer that keeps that state coherent.
//!
//! # Architecture Overview
//!
//! One [`session::BuildSession`] lives as long as the compiler's watch session:
//!
//! - Compiling the application entry rebuilds the **global component registry**
//!   ([`registry`]). When a rebuild changes it, every unit built against the old
//!   registry is refreshed and its markup regenerated.
//! - Compiling a unit's script spawns two forks. The component fork merges the
//!   unit's local components over the registry. The filter fork combines mixin
//!   filters, extracted once per mixin through the [`mixins`] cache, with the
//!   unit's own filters and emits a filter module ([`filters`]).
//! - Markup generation waits on the [`gate`] until the unit's record in the
//!   [`store`] is complete, then renders it.
//!
//! Everything the session does not own (script analysis, reference resolution,
//! template rendering, writing files, reporting diagnostics) sits behind the
//! traits in [`host`].
//!
//! # Core Modules
//!
//! - [`session`] - Build session: entries, unit forks, markup, replay
//! - [`store`] - Per-unit records
//! - [`registry`] - Global component registry with versioned snapshots
//! - [`mixins`] - Mixin filter cache with single extraction per mixin
//! - [`gate`] - Readiness waits over shared state
//! - [`filters`] - Filter definitions and generated filter modules
//! - [`layout`] - Output paths, export names and module names
//! - [`host`] - Collaborator traits and their default implementations
//!
//! ## Supporting Modules
//! - [`cli`] - The `mpdeps` command line
//! - [`config`] - `mpdeps.toml` loading
//! - [`core`] - Errors and unit identity
//! - [`utils`] - File-system helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use mpdeps::config::BuildConfig;
//! use mpdeps::host::{FrontmatterAnalyzer, Host, ParsedTemplate};
//! use mpdeps::session::{BuildSession, MarkupCall};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = BuildConfig::load_or_default(Path::new("mpdeps.toml"), Path::new(".")).await?;
//! let session = BuildSession::new(config.clone(), Host::for_config(&config)?);
//! session.without_global_components();
//!
//! let unit = config.source_dir.join("components/card.vue");
//! let source = std::fs::read_to_string(&unit)?;
//! let (_, template) = FrontmatterAnalyzer::split(&unit, &source)?;
//!
//! let handle = session.compile_script(&unit, &source, "data-v-1")?;
//! session.generate_markup(MarkupCall::new(&unit, ParsedTemplate::new(template))).await?;
//! handle.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod filters;
pub mod gate;
pub mod host;
pub mod layout;
pub mod mixins;
pub mod registry;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
