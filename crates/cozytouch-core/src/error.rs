// ── Core error types ──
//
// Hosts never see transport errors directly. Refresh failures are
// classified into `RefreshError`, command failures into `CommandError`,
// and everything surfaced to a host goes through `CoreError`.

use std::fmt;

use thiserror::Error;

// ── Refresh failures ─────────────────────────────────────────────────

/// Why a refresh cycle failed. Cloneable so the coordinator can keep the
/// last one around while handing copies to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Credentials rejected or session expired. Automatic refresh stops.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// The cloud rate-limited us. Previous snapshot is kept.
    #[error("too many requests: {message}")]
    Throttled {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Transport failure, timeout or unexpected response. Previous
    /// snapshot is kept.
    #[error("update failed: {message}")]
    Network { message: String },
}

impl RefreshError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

impl From<cozytouch_api::Error> for RefreshError {
    fn from(err: cozytouch_api::Error) -> Self {
        match err {
            cozytouch_api::Error::Authentication { message } => Self::Auth { message },
            cozytouch_api::Error::RateLimited { retry_after_secs } => Self::Throttled {
                message: "rate limited by cloud API".into(),
                retry_after_secs,
            },
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

// ── Malformed payload nodes ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    MissingId,
    MissingWidget,
    DuplicateId,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingId => "missing id",
            Self::MissingWidget => "missing widget",
            Self::DuplicateId => "duplicate id",
        })
    }
}

/// A payload node skipped during tree construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("skipped node at {path}: {reason}")]
pub struct MalformedNodeError {
    /// Position in the payload, e.g. `devices[2].subdevices[0]`.
    pub path: String,
    pub id: Option<String>,
    pub reason: MalformedReason,
}

// ── Command failures ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandErrorKind {
    /// Argument outside the widget's domain; nothing was sent.
    Validation(String),
    /// The widget has no such command; nothing was sent.
    Unsupported,
    Auth(String),
    Throttled,
    Network(String),
    /// The cloud answered but refused the command.
    Rejected(String),
}

impl fmt::Display for CommandErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(reason) => write!(f, "invalid argument: {reason}"),
            Self::Unsupported => f.write_str("not supported by this device"),
            Self::Auth(message) => write!(f, "authentication failed: {message}"),
            Self::Throttled => f.write_str("rate limited"),
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::Rejected(message) => write!(f, "rejected: {message}"),
        }
    }
}

impl From<cozytouch_api::Error> for CommandErrorKind {
    fn from(err: cozytouch_api::Error) -> Self {
        match err {
            cozytouch_api::Error::Authentication { message } => Self::Auth(message),
            cozytouch_api::Error::RateLimited { .. } => Self::Throttled,
            cozytouch_api::Error::Api { status, message } if status < 500 => {
                Self::Rejected(message)
            }
            other => Self::Network(other.to_string()),
        }
    }
}

/// A command that failed, either locally during validation or remotely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command {command} on {device_id} failed: {kind}")]
pub struct CommandError {
    pub device_id: String,
    pub command: String,
    pub kind: CommandErrorKind,
}

// ── Host-facing errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CoreError {
    /// Re-authentication is required before the integration can work again.
    #[error("Authentication failed: {message}")]
    AuthFailure { message: String },

    /// Transient refresh failure; the coordinator keeps retrying.
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Device not found in current snapshot: {id}")]
    DeviceNotFound { id: String },

    #[error("Entity not found: {unique_id}")]
    EntityNotFound { unique_id: String },

    #[error("Entity {unique_id} has no command '{command}'")]
    UnknownCommand { unique_id: String, command: String },

    #[error("Invalid argument for {command}: {message}")]
    InvalidArgument { command: String, message: String },

    #[error("Coordinator has been shut down")]
    Stopped,
}

impl From<RefreshError> for CoreError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Auth { message } => Self::AuthFailure { message },
            other => Self::UpdateFailed {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn refresh_classification() {
        let auth: RefreshError = cozytouch_api::Error::Authentication {
            message: "expired".into(),
        }
        .into();
        assert!(auth.is_auth());

        let throttled: RefreshError = cozytouch_api::Error::RateLimited {
            retry_after_secs: None,
        }
        .into();
        assert!(throttled.is_throttled());

        let timeout: RefreshError = cozytouch_api::Error::Timeout { timeout_secs: 10 }.into();
        assert!(matches!(timeout, RefreshError::Network { .. }));
    }

    #[test]
    fn refresh_errors_surface_as_host_errors() {
        let err: CoreError = RefreshError::Auth {
            message: "bad password".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthFailure { .. }));

        let err: CoreError = RefreshError::Network {
            message: "reset".into(),
        }
        .into();
        assert!(matches!(err, CoreError::UpdateFailed { .. }));
    }

    #[test]
    fn command_kind_from_api() {
        let kind: CommandErrorKind = cozytouch_api::Error::Api {
            status: 400,
            message: "nope".into(),
        }
        .into();
        assert_eq!(kind, CommandErrorKind::Rejected("nope".into()));
    }
}
