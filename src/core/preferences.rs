//! Preference snapshots consumed by the chat core.
//!
//! The core never writes preferences. It asks its [`PreferenceSource`] for a
//! fresh snapshot every time a request is built, so edits made between two
//! messages apply to the next send.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::warn;

use crate::api::ChatMessage;
use crate::core::config::{Config, PreferencesSection};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceContext {
    pub model: Option<String>,
    pub interests: BTreeSet<String>,
    pub system_prompt: String,
}

impl PreferenceContext {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.interests.is_empty() && self.system_prompt.is_empty()
    }

    /// System message carrying the prompt and interests, if there is anything to say.
    pub fn system_message(&self) -> Option<ChatMessage> {
        let mut parts = Vec::new();
        let prompt = self.system_prompt.trim();
        if !prompt.is_empty() {
            parts.push(prompt.to_string());
        }
        if !self.interests.is_empty() {
            let interests: Vec<&str> = self.interests.iter().map(String::as_str).collect();
            parts.push(format!("The user is interested in: {}.", interests.join(", ")));
        }
        if parts.is_empty() {
            None
        } else {
            Some(ChatMessage::new("system", parts.join("\n\n")))
        }
    }
}

impl From<&PreferencesSection> for PreferenceContext {
    fn from(section: &PreferencesSection) -> Self {
        Self {
            model: section
                .model
                .as_ref()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            interests: section
                .interests
                .iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            system_prompt: section.system_prompt.clone().unwrap_or_default(),
        }
    }
}

pub trait PreferenceSource: Send {
    fn snapshot(&self) -> PreferenceContext;
}

/// Fixed preferences, used by the headless command and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences(pub PreferenceContext);

impl PreferenceSource for StaticPreferences {
    fn snapshot(&self) -> PreferenceContext {
        self.0.clone()
    }
}

/// Reads the `[preferences]` table of the config file on every snapshot.
#[derive(Debug, Clone)]
pub struct ConfigFilePreferences {
    path: PathBuf,
}

impl ConfigFilePreferences {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PreferenceSource for ConfigFilePreferences {
    fn snapshot(&self) -> PreferenceContext {
        match Config::load_from_path(&self.path) {
            Ok(config) => PreferenceContext::from(&config.preferences),
            Err(err) => {
                warn!("using empty preferences: {err}");
                PreferenceContext::default()
            }
        }
    }
}
