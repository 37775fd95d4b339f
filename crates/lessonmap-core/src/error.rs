//! Error types for the LessonMap client.

use thiserror::Error;

/// A shared error type for the entire LessonMap client.
///
/// Variants follow the failure taxonomy of the client: network failures
/// (including a stream that could not start), diagram parse failures and
/// storage failures, plus the usual configuration and serialization errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LessonMapError {
    /// The lesson stream could not be opened.
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// HTTP or connection failure outside of stream start-up.
    #[error("Network error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// The server rejected the credentials (HTTP 401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Diagram text failed to parse.
    #[error("Diagram parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Persistent content store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid state transition in the generation flow.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LessonMapError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Network error with an optional HTTP status.
    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Network {
            status,
            message: message.into(),
        }
    }

    /// Creates a Parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from the network layer.
    ///
    /// Stream start-up failures count as network failures.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::GenerationUnavailable(_) | Self::Unauthorized(_)
        )
    }

    /// Check if this is a diagram parse error
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Check if this is a storage error
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for LessonMapError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for LessonMapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LessonMapError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for LessonMapError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for LessonMapError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, LessonMapError>`.
pub type Result<T> = std::result::Result<T, LessonMapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_display_includes_status() {
        let err = LessonMapError::network(Some(502), "bad gateway");
        assert_eq!(err.to_string(), "Network error (HTTP 502): bad gateway");

        let err = LessonMapError::network(None, "connection refused");
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn test_predicates() {
        assert!(LessonMapError::GenerationUnavailable("down".into()).is_network());
        assert!(LessonMapError::parse(3, "unexpected token").is_parse());
        assert!(LessonMapError::storage("locked").is_storage());
        assert!(LessonMapError::not_found("lesson", "abc").is_not_found());
        assert!(!LessonMapError::config("bad grade").is_network());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: LessonMapError = io.into();
        assert!(err.to_string().contains("PermissionDenied"));
    }
}
