//! Error types for a3s-emote

use thiserror::Error;

/// Errors that can occur while fetching or synchronizing emote catalogs
///
/// None of these reach callers of the client API: fetch failures collapse
/// into an absent snapshot and connection failures into a scheduled
/// reconnect. They exist so the internal boundaries can log precisely.
#[derive(Debug, Error)]
pub enum EmoteError {
    /// Request could not complete (DNS, TLS, connection reset, body read)
    #[error("Request to '{url}' failed: {reason}")]
    Network {
        url: String,
        reason: String,
    },

    /// Provider answered with a non-success status
    #[error("Request to '{url}' returned status {status}")]
    Status {
        url: String,
        status: u16,
    },

    /// Response body or stream message did not match its expected shape
    #[error("Schema mismatch in {payload}: {reason}")]
    SchemaMismatch {
        payload: String,
        reason: String,
    },

    /// Event-stream socket failure (open, send, or receive)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation on a socket that has already been closed
    #[error("Connection closed")]
    Closed,

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EmoteError {
    /// Build a schema mismatch from a serde error for the named payload
    pub fn schema(payload: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::SchemaMismatch {
            payload: payload.into(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for emote operations
pub type Result<T> = std::result::Result<T, EmoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = EmoteError::schema("7tv user", "missing field `emote_set`");
        assert_eq!(
            err.to_string(),
            "Schema mismatch in 7tv user: missing field `emote_set`"
        );
    }

    #[test]
    fn test_status_error_display() {
        let err = EmoteError::Status {
            url: "https://7tv.io/v3/emote-sets/global".to_string(),
            status: 503,
        };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EmoteError = serde_err.into();
        assert!(matches!(err, EmoteError::Serialization(_)));
    }
}
