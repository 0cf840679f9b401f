//! CLI error types and exit codes

use ad_provider::ProviderError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 3: Directory connection error
/// - 4: Validation error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Connection failed: {0}\n\nTroubleshooting:\n  - Check the 'ip' and 'port' provider settings\n  - Verify the bind user and password\n  - Set 'insecure: true' for self-signed certificates")]
    ConnectionFailed(String),

    #[error("{0}")]
    Provider(ProviderError),

    #[error("State file error: {0}")]
    State(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConnectionFailed(_) => 3,
            CliError::Validation(_) => 4,
            CliError::Provider(e) => match e {
                ProviderError::MissingAttribute(_)
                | ProviderError::InvalidAttribute { .. }
                | ProviderError::UnknownResourceType(_)
                | ProviderError::UnknownDataSource(_)
                | ProviderError::Validation(_) => 4,
                _ => 1,
            },
            CliError::State(_) | CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Provider(ProviderError::Ambiguous { .. }) => {
                Some("Narrow the lookup with 'dn' or a deeper 'parent'.")
            }
            CliError::Provider(e) if e.error_code() == "INVALID_CONFIG" => {
                Some("Password operations need 'ssl: true' in the provider block.")
            }
            _ => None,
        }
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        if e.is_connection_error() {
            CliError::ConnectionFailed(e.to_string())
        } else {
            CliError::Provider(e)
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::State(format!("JSON error: {}", e))
    }
}
