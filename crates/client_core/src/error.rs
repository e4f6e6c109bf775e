use thiserror::Error;

/// The one failure kind surfaced by the resource client.
///
/// Unreachable hosts, timeouts, non-success statuses and malformed bodies all
/// collapse into this shape so controllers have a single error path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    message: String,
    status: Option<u16>,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the failed response, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}
