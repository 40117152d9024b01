//! Positive integer settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config, success_set};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::Config;
use crate::core::constants::{DEFAULT_MAX_INPUT_CHARS, DEFAULT_REQUEST_TIMEOUT_SECS};

pub struct NumberHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_value: u64,
    unit: &'static str,
    get: fn(&Config) -> Option<u64>,
    set_field: fn(&mut Config, Option<u64>),
}

impl NumberHandler {
    fn display(&self, value: u64) -> String {
        if self.unit.is_empty() {
            value.to_string()
        } else {
            format!("{value} {}", self.unit)
        }
    }
}

impl SettingHandler for NumberHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let Some(input) = args.first() else {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        };
        let value = input
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| SettingError::InvalidNumber {
                key: self.key,
                input: input.clone(),
            })?;

        let set_field = self.set_field;
        mutate_config(ctx.config_path, move |config| set_field(config, Some(value)))?;
        Ok(success_set(self.key, &self.display(value)))
    }

    fn unset(&self, _arg: Option<&str>, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;
        mutate_config(ctx.config_path, move |config| set_field(config, None))?;
        Ok(format!(
            "✅ Unset {} (will use default: {})",
            self.key,
            self.display(self.default_value)
        ))
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {}", self.key, self.display(value)),
            None => format!(
                "  {}: (unset, default: {})",
                self.key,
                self.display(self.default_value)
            ),
        }
    }
}

pub fn max_input_chars_handler() -> NumberHandler {
    NumberHandler {
        key: "max-input-chars",
        hint: "To change the message length limit, specify a number of characters:",
        example: "causerie set max-input-chars 4000",
        default_value: DEFAULT_MAX_INPUT_CHARS as u64,
        unit: "",
        get: |c| c.max_input_chars.map(|v| v as u64),
        set_field: |c, v| {
            c.max_input_chars = v.map(|v| usize::try_from(v).unwrap_or(usize::MAX));
        },
    }
}

pub fn request_timeout_handler() -> NumberHandler {
    NumberHandler {
        key: "request-timeout",
        hint: "To change the one-shot request timeout, specify seconds:",
        example: "causerie set request-timeout 300",
        default_value: DEFAULT_REQUEST_TIMEOUT_SECS,
        unit: "s",
        get: |c| c.request_timeout_secs,
        set_field: |c, v| c.request_timeout_secs = v,
    }
}
