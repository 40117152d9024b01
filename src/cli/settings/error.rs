use std::fmt;

#[derive(Debug)]
pub enum SettingError {
    UnknownKey(String),
    InvalidBoolean(String),
    InvalidNumber { key: &'static str, input: String },
    InvalidValue { key: &'static str, reason: String },
    MissingArgs {
        hint: &'static str,
        example: &'static str,
    },
    ConfigError(String),
}

impl SettingError {
    /// Print the error to stderr, with the usage example when there is one.
    pub fn print(&self) {
        match self {
            SettingError::MissingArgs { hint, example } => {
                eprintln!("⚠️  {hint}");
                eprintln!("Example: {example}");
            }
            SettingError::InvalidBoolean(_) => {
                eprintln!("❌ {self}");
                eprintln!("   Use 'on' or 'off' (also accepts true/false, yes/no)");
            }
            SettingError::UnknownKey(_) => {
                eprintln!("❌ {self}");
                eprintln!("   Run 'causerie set' to list the available keys");
            }
            _ => eprintln!("❌ {self}"),
        }
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            SettingError::InvalidBoolean(input) => write!(f, "Invalid boolean value: {input}"),
            SettingError::InvalidNumber { key, input } => {
                write!(f, "{key} expects a positive whole number, got: {input}")
            }
            SettingError::InvalidValue { key, reason } => write!(f, "Invalid {key}: {reason}"),
            SettingError::MissingArgs { hint, .. } => write!(f, "{hint}"),
            SettingError::ConfigError(msg) => write!(f, "Failed to save configuration: {msg}"),
        }
    }
}

impl std::error::Error for SettingError {}
