//! Shared constants used across the application

/// Character budget of the composer when the config does not set one.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 2000;

/// The remaining-characters counter turns to the warning color below this.
pub const LOW_REMAINING_CHARS: usize = 100;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Path of the persistent channel endpoint, relative to the server URL.
pub const DEFAULT_SOCKET_PATH: &str = "/ws/socket.io";

/// Upper bound for a one-shot exchange; expiry surfaces as a transport error.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub const KEYRING_SERVICE: &str = "causerie";

/// Environment variable holding the tracing filter directive.
pub const LOG_FILTER_ENV: &str = "CAUSERIE_LOG";
