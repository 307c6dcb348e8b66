//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - Atomic output writes and path arithmetic (normalization, relative paths)
//!
//! # Example
//!
//! ```rust,no_run
//! use mpdeps::utils::{ensure_dir, safe_write};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("dist/components"))?;
//! safe_write(Path::new("dist/components/header.wxml"), "<view/>")?;
//! # Ok(())
//! # }
//! ```

pub mod fs;

pub use fs::{atomic_write, ensure_dir, normalize_path, relative_path, safe_write, to_slash};
