pub mod data;
pub mod io;


pub use data::{path_display, Config, PreferencesSection};
pub use io::ConfigError;
