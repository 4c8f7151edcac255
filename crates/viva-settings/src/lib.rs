//! # viva-settings
//!
//! Configuration management with layered sources for the Viva scoring
//! service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`VivaSettings::default()`]
//! 2. **Settings file** — JSON, deep-merged over defaults
//! 3. **Environment variables** — `VIVA_*` overrides (highest priority)
//!
//! The settings file path defaults to `~/.viva/settings.json` and can be
//! overridden with `VIVA_SETTINGS` or the server's `--config` flag.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
