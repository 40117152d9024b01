//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    default_model_handler, log_file_handler, max_input_chars_handler, request_timeout_handler,
    server_url_handler, socket_path_handler, streaming_handler, system_prompt_handler,
    username_handler, InterestsHandler,
};
use super::SettingHandler;
use crate::core::config::Config;

pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in the order `causerie set` lists them.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        registry.register(Box::new(server_url_handler()));
        registry.register(Box::new(socket_path_handler()));
        registry.register(Box::new(username_handler()));
        registry.register(Box::new(streaming_handler()));
        registry.register(Box::new(max_input_chars_handler()));
        registry.register(Box::new(request_timeout_handler()));
        registry.register(Box::new(log_file_handler()));
        registry.register(Box::new(default_model_handler()));
        registry.register(Box::new(InterestsHandler));
        registry.register(Box::new(system_prompt_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }

    /// One line per key, in display order.
    pub fn format_all(&self, config: &Config) -> Vec<String> {
        self.display_order
            .iter()
            .filter_map(|key| self.get(key))
            .map(|handler| handler.format(config))
            .collect()
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_is_listed_once() {
        let registry = SettingRegistry::new();
        let keys = registry.keys_display_order();
        assert_eq!(keys.len(), 10);
        for key in keys {
            assert!(registry.get(key).is_some(), "{key}");
        }
        assert!(registry.get("theme").is_none());
        assert_eq!(registry.format_all(&Config::default()).len(), 10);
    }
}
