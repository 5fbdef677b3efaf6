//! # quill-settings
//!
//! Configuration for the Quill service, loaded in three layers:
//!
//! 1. **Compiled defaults** — [`QuillSettings::default()`]
//! 2. **JSON file** — the path in `QUILL_SETTINGS`, if set (partial files
//!    are fine; missing fields keep their defaults)
//! 3. **Environment variables** — `QUILL_HOST`, `QUILL_PORT`, `QUILL_LOG`
//!    (highest priority)
//!
//! Out-of-range values are clamped with a warning rather than rejected, so
//! a bad file yields corrected behavior instead of a refused startup.

#![deny(unsafe_code)]

pub mod loader;
pub mod types;

pub use loader::{SettingsError, load_settings, load_settings_from_path};
pub use types::*;
