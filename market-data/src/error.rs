use thiserror::Error;

/// Any failed call to the upstream API: transport error, non-success status or a body
/// that does not decode into the expected shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("upstream request failed{}: {message}", status_suffix(.status))]
pub struct UpstreamError {
    /// HTTP status, when a response was received at all.
    pub status: Option<u16>,
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("malformed response body: {err}"))
    }
}
