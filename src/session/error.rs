// Errors surfaced by a generation session

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rate_limit::detect_rate_limit;

/// Failure reported by the chunk stream collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportError {
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
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

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Rate limited: {message}")]
    RateLimited {
        retry_after_ms: Option<u64>,
        message: String,
    },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("No data received for {0} seconds")]
    IdleTimeout(u64),

    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Message suitable for showing to the person who started the generation
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::RateLimited {
                retry_after_ms: Some(ms),
                ..
            } => format!(
                "The model is receiving too many requests. Please try again in {} seconds.",
                ms.div_ceil(1000)
            ),
            GenerationError::RateLimited { .. } => {
                "The model is receiving too many requests. Please try again later.".to_string()
            }
            GenerationError::Transport(_) => {
                "Generation failed before it finished. Please try again.".to_string()
            }
            GenerationError::IdleTimeout(_) => {
                "The model stopped responding. Please try again.".to_string()
            }
            GenerationError::Cancelled => "Generation was cancelled.".to_string(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::RateLimited { .. })
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            GenerationError::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

impl From<TransportError> for GenerationError {
    fn from(err: TransportError) -> Self {
        match detect_rate_limit(&err) {
            Some(info) => {
                log::warn!("Rate limit detected ({}): {}", info.limit_type, err);
                GenerationError::RateLimited {
                    retry_after_ms: info.retry_after_ms,
                    message: err.to_string(),
                }
            }
            None => GenerationError::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::with_status(502, "bad gateway").to_string(),
            "HTTP 502: bad gateway"
        );
        assert_eq!(TransportError::new("reset").to_string(), "reset");
    }

    #[test]
    fn test_rate_limited_classification() {
        let err: GenerationError = TransportError::with_status(429, "Retry-After: 2").into();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after_ms(), Some(2000));
        assert!(err.user_message().contains("try again in 2 seconds"));
    }

    #[test]
    fn test_generic_transport_classification() {
        let err: GenerationError = TransportError::new("connection reset").into();
        assert_eq!(
            err,
            GenerationError::Transport("connection reset".to_string())
        );
        assert!(!err.is_rate_limited());
        assert_eq!(err.retry_after_ms(), None);
    }

    #[test]
    fn test_user_messages() {
        let limited = GenerationError::RateLimited {
            retry_after_ms: None,
            message: "429".to_string(),
        };
        assert!(limited.user_message().contains("try again later"));
        assert!(GenerationError::IdleTimeout(5)
            .user_message()
            .contains("stopped responding"));
        assert_eq!(
            GenerationError::Cancelled.user_message(),
            "Generation was cancelled."
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            GenerationError::IdleTimeout(30).to_string(),
            "No data received for 30 seconds"
        );
        assert_eq!(
            GenerationError::Transport("HTTP 500: boom".to_string()).to_string(),
            "Transport failure: HTTP 500: boom"
        );
    }
}
