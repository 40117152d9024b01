use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config, split_tags};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::Config;

/// Handler for the `interests` tag list.
///
/// `set` adds comma-separated tags; `unset <tag>` removes one and a bare
/// `unset` clears them all.
pub struct InterestsHandler;

impl SettingHandler for InterestsHandler {
    fn key(&self) -> &'static str {
        "interests"
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let tags = split_tags(&args.join(" "));
        if tags.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To add interests, list them separated by commas:",
                example: "causerie set interests rust, jazz, chess",
            });
        }

        let added = mutate_config(ctx.config_path, |config| {
            let interests = &mut config.preferences.interests;
            let mut added = Vec::new();
            for tag in tags {
                if !interests.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                    interests.push(tag.clone());
                    added.push(tag);
                }
            }
            added
        })?;

        if added.is_empty() {
            Ok("✅ Interests unchanged".to_string())
        } else {
            Ok(format!("✅ Added interests: {}", added.join(", ")))
        }
    }

    fn unset(&self, arg: Option<&str>, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        match arg.map(str::trim).filter(|tag| !tag.is_empty()) {
            Some(tag) => {
                let tag = tag.to_string();
                let removed = mutate_config(ctx.config_path, |config| {
                    let interests = &mut config.preferences.interests;
                    let before = interests.len();
                    interests.retain(|t| !t.eq_ignore_ascii_case(&tag));
                    before != interests.len()
                })?;
                if removed {
                    Ok(format!("✅ Removed interest: {tag}"))
                } else {
                    Err(SettingError::InvalidValue {
                        key: "interests",
                        reason: format!("'{tag}' is not in the list"),
                    })
                }
            }
            None => {
                mutate_config(ctx.config_path, |config| config.preferences.interests.clear())?;
                Ok("✅ Cleared interests".to_string())
            }
        }
    }

    fn format(&self, config: &Config) -> String {
        if config.preferences.interests.is_empty() {
            "  interests: (none)".to_string()
        } else {
            format!("  interests: {}", config.preferences.interests.join(", "))
        }
    }
}
