//! Provider error types.

use ad_connector::error::ConnectorError;
use thiserror::Error;

/// Error returned by resource, data source and provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Directory operation failed.
    #[error(transparent)]
    Directory(#[from] ConnectorError),

    /// A required attribute has no value.
    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    /// An attribute has a value of the wrong type or outside its domain.
    #[error("invalid value for attribute '{name}': {message}")]
    InvalidAttribute { name: String, message: String },

    /// A lookup that must be unique matched several entries.
    #[error("found ambiguous values for {kind}: {name}")]
    Ambiguous { kind: String, name: String },

    /// A data source lookup matched nothing.
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// The resource type is not served by this provider.
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    /// The data source is not served by this provider.
    #[error("unknown data source: {0}")]
    UnknownDataSource(String),

    /// An operation was requested before `configure`.
    #[error("provider is not configured")]
    NotConfigured,

    /// Configuration failed schema validation.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// State could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Create an invalid attribute error.
    pub fn invalid_attribute(name: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::InvalidAttribute {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an ambiguous result error.
    pub fn ambiguous(kind: impl Into<String>, name: impl Into<String>) -> Self {
        ProviderError::Ambiguous {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        ProviderError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Check if retrying could help.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Directory(e) if e.is_transient())
    }

    /// Whether the error comes from reaching or authenticating to the server.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ProviderError::Directory(
                ConnectorError::ConnectionFailed { .. }
                    | ConnectorError::ConnectionTimeout { .. }
                    | ConnectorError::NetworkError { .. }
                    | ConnectorError::AuthenticationFailed
            )
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::Directory(e) => e.error_code(),
            ProviderError::MissingAttribute(_) => "MISSING_ATTRIBUTE",
            ProviderError::InvalidAttribute { .. } => "INVALID_ATTRIBUTE",
            ProviderError::Ambiguous { .. } => "AMBIGUOUS_RESULT",
            ProviderError::NotFound { .. } => "NOT_FOUND",
            ProviderError::UnknownResourceType(_) => "UNKNOWN_RESOURCE_TYPE",
            ProviderError::UnknownDataSource(_) => "UNKNOWN_DATA_SOURCE",
            ProviderError::NotConfigured => "NOT_CONFIGURED",
            ProviderError::Validation(_) => "VALIDATION_FAILED",
            ProviderError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
