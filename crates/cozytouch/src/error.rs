//! CLI error types with miette diagnostics.
//!
//! Maps library errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use cozytouch_config::ConfigError;
use cozytouch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Cozytouch cloud: {reason}")]
    #[diagnostic(
        code(cozytouch::connection_failed),
        help(
            "Check your network connection and the base_url setting.\n\
             The service also refuses requests for a while after too many logins."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(cozytouch::auth_failed),
        help("Verify the username and password used by the Cozytouch mobile app.")
    )]
    AuthFailed { message: String },

    #[error("No {what} configured")]
    #[diagnostic(
        code(cozytouch::no_credentials),
        help(
            "Set it in {path},\n\
             pass --username / --password, or export COZYTOUCH_USERNAME / COZYTOUCH_PASSWORD."
        )
    )]
    NoCredentials { what: String, path: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(cozytouch::not_found),
        help("Run: cozytouch {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Command failed: {message}")]
    #[diagnostic(code(cozytouch::command_failed))]
    CommandFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cozytouch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(cozytouch::config))]
    Config(ConfigError),

    // ── Serialization ────────────────────────────────────────────────
    #[error("Invalid JSON arguments: {0}")]
    #[diagnostic(
        code(cozytouch::json),
        help("Arguments must be a JSON object, e.g. '{{\"temperature\": 21}}'")
    )]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Library error mapping ────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthFailure { message } => Self::AuthFailed { message },
            CoreError::UpdateFailed { message } => Self::ConnectionFailed { reason: message },
            CoreError::DeviceNotFound { id } => Self::NotFound {
                resource_type: "device".into(),
                identifier: id,
                list_command: "devices".into(),
            },
            CoreError::EntityNotFound { unique_id } => Self::NotFound {
                resource_type: "entity".into(),
                identifier: unique_id,
                list_command: "entities".into(),
            },
            CoreError::UnknownCommand { unique_id, command } => Self::Validation {
                field: "command".into(),
                reason: format!("{unique_id} has no command '{command}'"),
            },
            CoreError::InvalidArgument { command, message } => Self::Validation {
                field: command,
                reason: message,
            },
            CoreError::Command(e) => Self::CommandFailed {
                message: e.to_string(),
            },
            CoreError::Stopped => Self::CommandFailed {
                message: "the integration has been shut down".into(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { what } => Self::NoCredentials {
                what: what.into(),
                path: cozytouch_config::config_path().display().to_string(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other @ ConfigError::Figment(_) => Self::Config(other),
        }
    }
}

impl From<cozytouch_api::Error> for CliError {
    fn from(err: cozytouch_api::Error) -> Self {
        match err {
            cozytouch_api::Error::Authentication { message } => Self::AuthFailed { message },
            other => Self::ConnectionFailed {
                reason: other.to_string(),
            },
        }
    }
}
