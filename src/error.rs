//! Error taxonomy shared by every transport.
//!
//! `ValidationError` is produced by [`crate::validate`]; `RelayError` wraps it
//! together with the bridge-side failures. Transports never see anything else:
//! each binding maps a `RelayError` onto its own response shape (HTTP status,
//! MCP tool error) via [`RelayError::kind`].

use std::time::Duration;
use thiserror::Error;

/// Field-level rejection of a request's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field '{field}' must be one of [{}], got '{value}'", .allowed.join(", "))]
    NotInEnum {
        field: String,
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("field '{field}' out of range: {value} not in {min}..={max}")]
    OutOfRange {
        field: String,
        value: i128,
        min: i64,
        max: i64,
    },

    #[error("field '{field}' is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("params must be a JSON object")]
    NotAnObject,
}

impl ValidationError {
    /// Name of the offending field, if the error is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::WrongType { field, .. }
            | ValidationError::NotInEnum { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::UnknownField { field } => Some(field),
            ValidationError::NotAnObject => None,
        }
    }

    /// Stable machine-readable tag.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::WrongType { .. } => "wrong_type",
            ValidationError::NotInEnum { .. } => "value_not_in_enum",
            ValidationError::OutOfRange { .. } => "out_of_range",
            ValidationError::InvalidFormat { .. } => "invalid_format",
            ValidationError::UnknownField { .. } => "unknown_field",
            ValidationError::NotAnObject => "not_an_object",
        }
    }
}

/// Coarse classification used by transports to choose a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownCommand,
    Validation,
    BridgeNotFound,
    DeviceUnavailable,
    ExternalFailure,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownCommand => "unknown_command",
            ErrorKind::Validation => "validation_error",
            ErrorKind::BridgeNotFound => "bridge_not_found",
            ErrorKind::DeviceUnavailable => "device_unavailable",
            ErrorKind::ExternalFailure => "external_failure",
            ErrorKind::Timeout => "timeout",
        }
    }
}

/// Everything a single dispatch can fail with. Each variant carries the
/// command name so the caller-facing message is self-contained.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },

    #[error("{command}: {source}")]
    Validation {
        command: String,
        #[source]
        source: ValidationError,
    },

    #[error("{command}: bridge executable '{program}' not found on PATH")]
    BridgeNotFound { command: String, program: String },

    #[error("{command}: device unavailable: {reason}")]
    DeviceUnavailable { command: String, reason: String },

    #[error("{command}: bridge failed{}: {diagnostic}", exit_suffix(.code))]
    ExternalFailure {
        command: String,
        code: Option<i32>,
        diagnostic: String,
    },

    #[error("{command}: failed to launch bridge '{program}': {source}")]
    Spawn {
        command: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command}: bridge did not finish within {} ms", .after.as_millis())]
    Timeout { command: String, after: Duration },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" (exit {c})"),
        None => String::new(),
    }
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            RelayError::Validation { .. } => ErrorKind::Validation,
            RelayError::BridgeNotFound { .. } => ErrorKind::BridgeNotFound,
            RelayError::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            RelayError::ExternalFailure { .. } | RelayError::Spawn { .. } => {
                ErrorKind::ExternalFailure
            }
            RelayError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub fn command(&self) -> &str {
        match self {
            RelayError::UnknownCommand { command }
            | RelayError::Validation { command, .. }
            | RelayError::BridgeNotFound { command, .. }
            | RelayError::DeviceUnavailable { command, .. }
            | RelayError::ExternalFailure { command, .. }
            | RelayError::Spawn { command, .. }
            | RelayError::Timeout { command, .. } => command,
        }
    }

    /// Offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            RelayError::Validation { source, .. } => source.field(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_command_and_field() {
        let err = RelayError::Validation {
            command: "swipe".into(),
            source: ValidationError::OutOfRange {
                field: "startX".into(),
                value: -5,
                min: 0,
                max: 100_000,
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("swipe:"));
        assert!(msg.contains("startX"));
        assert_eq!(err.field(), Some("startX"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn enum_error_lists_allowed_values() {
        let err = ValidationError::NotInEnum {
            field: "action".into(),
            value: "loud".into(),
            allowed: vec!["increase", "decrease", "mute"],
        };
        assert_eq!(
            err.to_string(),
            "field 'action' must be one of [increase, decrease, mute], got 'loud'"
        );
        assert_eq!(err.code(), "value_not_in_enum");
    }

    #[test]
    fn spawn_failure_is_reported_as_external() {
        let err = RelayError::Spawn {
            command: "tap".into(),
            program: "adb".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.kind(), ErrorKind::ExternalFailure);
        assert_eq!(err.command(), "tap");
    }

    #[test]
    fn external_failure_includes_exit_code() {
        let err = RelayError::ExternalFailure {
            command: "tap".into(),
            code: Some(1),
            diagnostic: "error: closed".into(),
        };
        assert_eq!(err.to_string(), "tap: bridge failed (exit 1): error: closed");
    }
}
