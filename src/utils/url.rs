//! URL utilities for consistent endpoint construction

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use causerie::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://127.0.0.1:5000/"), "http://127.0.0.1:5000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path without doubling slashes
///
/// # Examples
///
/// ```
/// use causerie::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://127.0.0.1:5000/", "/api/chat"),
///     "http://127.0.0.1:5000/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

/// Build the WebSocket URL for `path` on the server at `base_url`.
///
/// `http` maps to `ws` and `https` to `wss`; URLs without a scheme are
/// treated as plain `ws`.
pub fn websocket_url(base_url: &str, path: &str) -> String {
    let joined = construct_api_url(base_url, path);
    if let Some(rest) = joined.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = joined.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if joined.starts_with("ws://") || joined.starts_with("wss://") {
        joined
    } else {
        format!("ws://{joined}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://chat.local:5000"),
            "http://chat.local:5000"
        );
        assert_eq!(
            normalize_base_url("http://chat.local:5000///"),
            "http://chat.local:5000"
        );
        assert_eq!(normalize_base_url("  http://chat.local/ "), "http://chat.local");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("http://chat.local", "api/models"),
            "http://chat.local/api/models"
        );
        assert_eq!(
            construct_api_url("http://chat.local/", "///api/models"),
            "http://chat.local/api/models"
        );
        assert_eq!(
            construct_api_url("http://chat.local/prefix/", "/api/auth/check"),
            "http://chat.local/prefix/api/auth/check"
        );
    }

    #[test]
    fn test_websocket_url_maps_schemes() {
        assert_eq!(
            websocket_url("http://127.0.0.1:5000", "/ws"),
            "ws://127.0.0.1:5000/ws"
        );
        assert_eq!(
            websocket_url("https://chat.example.org/", "ws"),
            "wss://chat.example.org/ws"
        );
        assert_eq!(websocket_url("chat.local", "/ws"), "ws://chat.local/ws");
        assert_eq!(
            websocket_url("wss://chat.example.org", "/ws"),
            "wss://chat.example.org/ws"
        );
    }
}
