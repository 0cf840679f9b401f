//! Directory error types
//!
//! Every failure a directory backend reports, classified as transient
//! (reconnect or retry may help) or permanent.

use thiserror::Error;

/// Error returned by directory operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Transport
    /// The server could not be reached or the bind could not be sent.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connecting took longer than the configured timeout.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// The connection broke while a request was in flight.
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server answered busy (51) or unavailable (52).
    #[error("server unavailable (code {code}): {message}")]
    ServerUnavailable { code: u32, message: String },

    // Credentials
    /// The bind was rejected (49).
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// The bound account may not perform the operation (50).
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    // Local state
    /// Settings are missing or inconsistent, or an operation needs a
    /// capability the configuration does not provide.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The directory handle was used after `dispose`.
    #[error("connector has been disposed")]
    Disposed,

    // Entry level
    /// Add or modify target already exists (68, 20).
    #[error("object already exists: {identifier}")]
    ObjectAlreadyExists { identifier: String },

    /// Target entry or search base does not exist (32).
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },

    /// The server refused the change (19, 53), e.g. password policy.
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// A value could not be decoded or encoded.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Any other non-zero result code.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Whether reconnecting or retrying could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::NetworkError { .. }
                | ConnectorError::ServerUnavailable { .. }
        )
    }

    /// Stable code for logs and exit status mapping.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::NetworkError { .. } => "NETWORK_ERROR",
            ConnectorError::ServerUnavailable { .. } => "SERVER_UNAVAILABLE",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::Disposed => "DISPOSED",
            ConnectorError::ObjectAlreadyExists { .. } => "OBJECT_EXISTS",
            ConnectorError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            ConnectorError::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
            ConnectorError::OperationFailed { .. } => "OPERATION_FAILED",
        }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::NetworkError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        ConnectorError::InvalidData {
            message: message.into(),
        }
    }
}

/// Result type for directory operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
