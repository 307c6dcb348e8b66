//! Integration test suite for mpdeps
//!
//! End-to-end tests that drive a build session over a temporary project with
//! the default file-system resolver and frontmatter analyzer, collecting
//! emitted artifacts in memory.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: `mpdeps build` end to end
//! - **hot_rebuild**: Global registry changes and replay of stale units
//! - **mixin_filters**: Mixin filter merging and single extraction per mixin
//! - **page_markup**: Page entries and platforms that append page markup
//! - **readiness**: Waiting for records, failures and timeouts

mod cli;
mod hot_rebuild;
mod mixin_filters;
mod page_markup;
mod readiness;
