use std::path::Path;

use crate::core::config::Config;

use super::error::SettingError;

/// [`Config::mutate_at`] with errors mapped to [`SettingError::ConfigError`].
pub fn mutate_config<T>(
    config_path: &Path,
    edit: impl FnOnce(&mut Config) -> T,
) -> Result<T, SettingError> {
    Config::mutate_at(config_path, edit).map_err(|e| SettingError::ConfigError(e.to_string()))
}

/// Accepts on/off, true/false, yes/no and 1/0, case-insensitively.
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn success_set(key: &str, value: &str) -> String {
    format!("✅ Set {key} to: {value}")
}

pub fn success_unset(key: &str) -> String {
    format!("✅ Unset {key}")
}

/// Split `rust, jazz ,` into trimmed, non-empty tags.
pub fn split_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
