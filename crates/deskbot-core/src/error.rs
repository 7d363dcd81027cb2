//! Error types for deskbot.

use thiserror::Error;

/// A shared error type for the entire deskbot workspace.
///
/// Variants follow the failure taxonomy of the ticket flow: validation
/// failures are re-prompted, transient failures are retried and then
/// degraded, conflicts are resolved through the idempotency key, and
/// configuration failures only ever happen at startup.
#[derive(Error, Debug, Clone)]
pub enum DeskbotError {
    /// The user supplied an empty or malformed issue description.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Timeout, rate limit or unavailable collaborator.
    #[error("Transient error from {collaborator}: {message}")]
    Transient {
        collaborator: &'static str,
        message: String,
    },

    /// A ticket with the same idempotency key already exists.
    #[error("Conflict: ticket already exists for idempotency key '{idempotency_key}'")]
    Conflict { idempotency_key: String },

    /// Missing credentials, endpoints or an invalid rule table.
    #[error("Fatal configuration error: {0}")]
    FatalConfiguration(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Storage error (session store, ticket store)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeskbotError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Transient error for the named collaborator
    pub fn transient(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Transient {
            collaborator,
            message: message.into(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(idempotency_key: impl Into<String>) -> Self {
        Self::Conflict {
            idempotency_key: idempotency_key.into(),
        }
    }

    /// Creates a FatalConfiguration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::FatalConfiguration(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a Conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true when retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// A message that is safe to show to the end user.
    ///
    /// Never contains collaborator error text; the full error is only
    /// written to the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(reason) => reason.clone(),
            Self::Transient { .. } => {
                "The ticketing system is not responding right now. Your details are saved; say \"retry\" to try again.".to_string()
            }
            Self::Conflict { .. } => "This ticket has already been created.".to_string(),
            Self::NotFound { entity_type, .. } => format!("The requested {} could not be found.", entity_type),
            Self::FatalConfiguration(_)
            | Self::Storage(_)
            | Self::Serialization { .. }
            | Self::Internal(_) => {
                "Something went wrong on our side. Please try again in a moment.".to_string()
            }
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for DeskbotError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for DeskbotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DeskbotError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for DeskbotError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<tokio::time::error::Elapsed> for DeskbotError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Transient {
            collaborator: "timeout",
            message: "call exceeded its deadline".to_string(),
        }
    }
}

/// A type alias for `Result<T, DeskbotError>`.
pub type Result<T> = std::result::Result<T, DeskbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_hides_collaborator_detail() {
        let err = DeskbotError::transient("ticket-store", "HTTP 503 upstream secret-host.internal");
        let message = err.user_message();
        assert!(!message.contains("secret-host"));
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = DeskbotError::validation("Please describe the issue.");
        assert_eq!(err.user_message(), "Please describe the issue.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn storage_error_is_not_retryable() {
        let err: DeskbotError = std::io::Error::other("disk full").into();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("disk full"));
    }
}
