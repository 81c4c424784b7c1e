//! CLI error types and exit codes

use idc_scim_client::{ConfigError, ScimClientError, ValidationError};
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 2: Configuration error
/// - 3: Network error
/// - 4: Validation error
/// - 5: Directory error
/// - 6: Finished with per-item errors
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection failed: {0}\n\nTroubleshooting:\n  - Verify the SCIM endpoint is correct\n  - Check that the directory is reachable from this host")]
    ConnectionFailed(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Cannot read {path}: {message}")]
    Input { path: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("{0} item(s) failed; see the errors above")]
    Partial(usize),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Network(_) | CliError::ConnectionFailed(_) => 3,
            CliError::Validation(_) | CliError::Input { .. } | CliError::NotFound(_) => 4,
            CliError::Directory(_) => 5,
            CliError::Partial(_) => 6,
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
            CliError::Config(_) => Some(
                "Set SCIM_ENDPOINT and SCIM_TOKEN, pass --config <file>, or use --endpoint/--token.",
            ),
            CliError::Partial(_) => Some("Re-run once the failing records are fixed."),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ValidationError> for CliError {
    fn from(e: ValidationError) -> Self {
        CliError::Validation(e.to_string())
    }
}

impl From<ScimClientError> for CliError {
    fn from(e: ScimClientError) -> Self {
        match e {
            ScimClientError::Config(e) => e.into(),
            ScimClientError::Validation(e) => e.into(),
            ScimClientError::MissingId { .. } => CliError::Validation(e.to_string()),
            ScimClientError::Http(ref inner) if inner.is_connect() => {
                CliError::ConnectionFailed(e.to_string())
            }
            ScimClientError::Http(ref inner) if inner.is_timeout() => {
                CliError::Network("Request timed out".to_string())
            }
            ScimClientError::Http(_) => CliError::Network(e.to_string()),
            ScimClientError::Protocol(_)
            | ScimClientError::ParseError(_)
            | ScimClientError::Json(_)
            | ScimClientError::IncompleteMembership(_) => CliError::Directory(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Validation(format!("JSON error: {}", e))
    }
}
