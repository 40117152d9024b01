use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;

/// Failures talking to the chat server over HTTP.
#[derive(Debug)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused, timeout, ...).
    Network(reqwest::Error),
    /// The session cookie is missing or expired.
    Unauthorized,
    /// Any other non-success status, with a one-line summary of the body.
    Status { status: StatusCode, summary: String },
    /// The response body was not what the endpoint promises.
    Decode(String),
}

impl ApiError {
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized;
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        ApiError::Status {
            status,
            summary: summarize_error_body(&body),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.status() == Some(StatusCode::UNAUTHORIZED) {
            ApiError::Unauthorized
        } else {
            ApiError::Network(err)
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(err) if err.is_timeout() => write!(f, "Request timed out"),
            ApiError::Network(err) => write!(f, "Network error: {err}"),
            ApiError::Unauthorized => write!(f, "Not logged in (session expired)"),
            ApiError::Status { status, summary } if summary.is_empty() => {
                write!(f, "Server error {}", status.as_u16())
            }
            ApiError::Status { status, summary } => {
                write!(f, "Server error {}: {summary}", status.as_u16())
            }
            ApiError::Decode(detail) => write!(f, "Unexpected response from server: {detail}"),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Network(err) => Some(err),
            _ => None,
        }
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
}

/// Reduce an error body to a single line suitable for a failure marker.
pub fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let text = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| extract_error_summary(&value))
        .unwrap_or_else(|| trimmed.to_string());

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
