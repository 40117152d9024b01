//! Settings management for the `set` and `unset` commands.
//!
//! Each configuration key has a [`SettingHandler`]. Handlers are mostly
//! data-driven:
//!
//! - Text settings (e.g., `server-url`, `default-model`)
//! - Boolean settings (`streaming`)
//! - Numeric settings (`max-input-chars`, `request-timeout`)
//! - The `interests` list, which is edited one tag at a time

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

use std::path::Path;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::Config;

/// Context provided to setting handlers during set/unset operations.
pub struct SetContext<'a> {
    pub config_path: &'a Path,
}

pub trait SettingHandler: Send + Sync {
    fn key(&self) -> &'static str;

    /// Set the value from the arguments given after the key.
    ///
    /// Returns the message to print on success.
    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Clear the value. `arg` narrows the operation for list settings.
    fn unset(&self, arg: Option<&str>, ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Current value, formatted for the `set` listing.
    fn format(&self, config: &Config) -> String;
}
