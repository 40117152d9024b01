//! Free-text settings, with optional normalization.

use std::path::PathBuf;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config, success_set, success_unset};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::{path_display, Config};
use crate::core::constants::{DEFAULT_SERVER_URL, DEFAULT_SOCKET_PATH};
use crate::utils::url::normalize_base_url;

pub struct TextHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: Option<&'static str>,
    normalize: fn(&str) -> Result<String, String>,
    get: fn(&Config) -> Option<String>,
    set_field: fn(&mut Config, Option<String>),
}

impl SettingHandler for TextHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let input = args.join(" ");
        if input.trim().is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }
        let value = (self.normalize)(&input).map_err(|reason| SettingError::InvalidValue {
            key: self.key,
            reason,
        })?;

        let message = success_set(self.key, &value);
        let set_field = self.set_field;
        mutate_config(ctx.config_path, move |config| set_field(config, Some(value)))?;
        Ok(message)
    }

    fn unset(&self, _arg: Option<&str>, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;
        mutate_config(ctx.config_path, move |config| set_field(config, None))?;
        Ok(match self.default_display {
            Some(default) => format!("✅ Unset {} (will use default: {default})", self.key),
            None => success_unset(self.key),
        })
    }

    fn format(&self, config: &Config) -> String {
        match ((self.get)(config), self.default_display) {
            (Some(value), _) => format!("  {}: {value}", self.key),
            (None, Some(default)) => format!("  {}: (unset, default: {default})", self.key),
            (None, None) => format!("  {}: (unset)", self.key),
        }
    }
}

fn trimmed(input: &str) -> Result<String, String> {
    Ok(input.trim().to_string())
}

fn server_url(input: &str) -> Result<String, String> {
    let url = normalize_base_url(input);
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Err(format!("{url} must start with http:// or https://"))
    }
}

fn socket_path(input: &str) -> Result<String, String> {
    let path = input.trim();
    if path.contains(char::is_whitespace) {
        return Err("paths cannot contain spaces".to_string());
    }
    Ok(format!("/{}", path.trim_start_matches('/')))
}

fn single_word(input: &str) -> Result<String, String> {
    let value = input.trim();
    if value.contains(char::is_whitespace) {
        Err(format!("'{value}' contains spaces"))
    } else {
        Ok(value.to_string())
    }
}

pub fn server_url_handler() -> TextHandler {
    TextHandler {
        key: "server-url",
        hint: "To point at a chat server, specify its base URL:",
        example: "causerie set server-url http://192.168.1.20:5000",
        default_display: Some(DEFAULT_SERVER_URL),
        normalize: server_url,
        get: |c| c.server_url.clone(),
        set_field: |c, v| c.server_url = v,
    }
}

pub fn socket_path_handler() -> TextHandler {
    TextHandler {
        key: "socket-path",
        hint: "To change the streaming endpoint, specify its path:",
        example: "causerie set socket-path /ws/socket.io",
        default_display: Some(DEFAULT_SOCKET_PATH),
        normalize: socket_path,
        get: |c| c.socket_path.clone(),
        set_field: |c, v| c.socket_path = v,
    }
}

pub fn username_handler() -> TextHandler {
    TextHandler {
        key: "username",
        hint: "To log in without being asked, specify your username:",
        example: "causerie set username alice",
        default_display: None,
        normalize: single_word,
        get: |c| c.username.clone(),
        set_field: |c, v| c.username = v,
    }
}

pub fn log_file_handler() -> TextHandler {
    TextHandler {
        key: "log-file",
        hint: "To change where diagnostics are written, specify a file:",
        example: "causerie set log-file ~/causerie.log",
        default_display: Some("<data dir>/causerie.log"),
        normalize: trimmed,
        get: |c| c.log_file.as_ref().map(path_display),
        set_field: |c, v| c.log_file = v.map(PathBuf::from),
    }
}

pub fn default_model_handler() -> TextHandler {
    TextHandler {
        key: "default-model",
        hint: "To preselect a model, specify its name as listed by 'causerie models':",
        example: "causerie set default-model llama3:8b",
        default_display: None,
        normalize: single_word,
        get: |c| c.preferences.model.clone(),
        set_field: |c, v| c.preferences.model = v,
    }
}

pub fn system_prompt_handler() -> TextHandler {
    TextHandler {
        key: "system-prompt",
        hint: "To give the assistant standing instructions, specify them:",
        example: "causerie set system-prompt Answer in French.",
        default_display: None,
        normalize: trimmed,
        get: |c| c.preferences.system_prompt.clone(),
        set_field: |c, v| c.preferences.system_prompt = v,
    }
}
