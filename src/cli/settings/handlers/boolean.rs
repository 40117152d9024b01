//! Boolean setting handlers for on/off settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{format_bool, mutate_config, parse_bool};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::Config;

/// Data-driven handler for on/off settings.
pub struct BooleanHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    get: fn(&Config) -> Option<bool>,
    set_field: fn(&mut Config, Option<bool>),
}

impl SettingHandler for BooleanHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let input = args.join(" ");
        let value = parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))?;
        let set_field = self.set_field;
        mutate_config(ctx.config_path, move |config| set_field(config, Some(value)))?;

        Ok(format!("✅ Set {} to: {}", self.key, format_bool(value)))
    }

    fn unset(&self, _arg: Option<&str>, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;
        mutate_config(ctx.config_path, move |config| set_field(config, None))?;
        Ok(format!(
            "✅ Unset {} (will use default: {})",
            self.key, self.default_display
        ))
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {}", self.key, format_bool(value)),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

/// Handler for the `streaming` setting. Off forces one-shot exchanges.
pub fn streaming_handler() -> BooleanHandler {
    BooleanHandler {
        key: "streaming",
        hint: "To enable or disable the streaming channel, specify on or off:",
        example: "causerie set streaming off",
        default_display: "on",
        get: |c| c.streaming,
        set_field: |c, v| c.streaming = v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn streaming_round_trips_through_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let ctx = SetContext {
            config_path: &path,
        };
        let handler = streaming_handler();

        let message = handler.set(&["off".to_string()], &ctx).unwrap();
        assert_eq!(message, "✅ Set streaming to: off");
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.streaming, Some(false));
        assert_eq!(handler.format(&loaded), "  streaming: off");

        handler.unset(None, &ctx).unwrap();
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(handler.format(&loaded), "  streaming: (unset, default: on)");
    }

    #[test]
    fn rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let ctx = SetContext {
            config_path: &path,
        };
        let err = streaming_handler()
            .set(&["sometimes".to_string()], &ctx)
            .unwrap_err();
        assert!(matches!(err, SettingError::InvalidBoolean(_)));
        assert!(!path.exists());
    }
}
