//! Backend error types

use thiserror::Error;

/// Backend call failure with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    /// HTTP status, or 0 when no response was received
    pub status: u16,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: 0,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unknown, message)
    }

    /// Classify a non-success response.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let kind = match code {
            401 | 403 => ApiErrorKind::Auth,
            400 => ApiErrorKind::InvalidRequest,
            500..=599 => ApiErrorKind::ServerError,
            _ => ApiErrorKind::Unknown,
        };
        Self::new(kind, format!("HTTP {status}: {body}")).with_status(code)
    }

    /// Classify a failure that happened before a response arrived.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::network(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::network(format!("Connection failed: {e}"))
        } else if e.is_decode() {
            Self::decode(format!("Failed to decode response: {e}"))
        } else {
            Self::unknown(format!("Request failed: {e}"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Connection refused, reset, timed out
    Network,
    /// 401, 403
    Auth,
    /// 400
    InvalidRequest,
    /// 5xx
    ServerError,
    /// Response arrived but could not be read
    Decode,
    Unknown,
}
