use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_MAX_INPUT_CHARS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_URL,
    DEFAULT_SOCKET_PATH,
};

/// Per-user preferences injected into every outgoing request.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct PreferencesSection {
    /// Model selected when the catalog loads, if the server offers it
    pub model: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub system_prompt: Option<String>,
}

impl PreferencesSection {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.interests.is_empty() && self.system_prompt.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Base URL of the chat server (e.g., "http://127.0.0.1:5000")
    pub server_url: Option<String>,
    /// Path of the WebSocket endpoint on the server
    pub socket_path: Option<String>,
    pub username: Option<String>,
    /// Use the persistent streaming channel when it is reachable
    pub streaming: Option<bool>,
    pub max_input_chars: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    /// Where tracing output goes while the full-screen UI owns the terminal
    pub log_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "PreferencesSection::is_empty")]
    pub preferences: PreferencesSection,
}

impl Config {
    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn socket_path(&self) -> &str {
        self.socket_path.as_deref().unwrap_or(DEFAULT_SOCKET_PATH)
    }

    pub fn streaming_enabled(&self) -> bool {
        self.streaming.unwrap_or(true)
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
            .filter(|max| *max > 0)
            .unwrap_or(DEFAULT_MAX_INPUT_CHARS)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
