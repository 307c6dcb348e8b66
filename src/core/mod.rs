//! Core types for mpdeps
//!
//! This module holds the vocabulary shared by every other module: error types
//! and the identity/classification of compilation units.
//!
//! ## `error` - Error Handling
//!
//! - [`MpError`] - Enumerated error types covering resolution, analysis and readiness failures
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! ## `unit` - Compilation Units
//!
//! - [`UnitId`] - Identity of a compiled source file (its absolute path)
//! - [`PageType`] - Whether a unit is the app entry, a page entry or a plain component
//!
//! # Examples
//!
//! ```rust
//! use mpdeps::core::{PageType, UnitId};
//!
//! let unit = UnitId::new("/project/src/components/header.vue");
//! assert_eq!(unit.context().to_str(), Some("/project/src/components"));
//! assert!(!PageType::Component.is_entry());
//! ```

pub mod error;
pub mod unit;

pub use error::{ErrorContext, MpError, user_friendly_error};
pub use unit::{PageType, UnitId};
