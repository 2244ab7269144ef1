//! Login and collaborator error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to the caller of the authenticator
///
/// The two login outcomes carry the challenge context computed by the
/// throttle so the outer handler can ask for a human-verification step.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// Too many recent failures from this origin; credentials were not checked
    #[error("Too many failed login attempts")]
    RejectedLockedOut { challenge_required: bool },

    /// Unknown user, inactive user or wrong password
    #[error("Authentication failed: invalid login or password")]
    AuthenticationFailed { challenge_required: bool },

    /// A user, group or ledger collaborator failed
    #[error("Repository error during authentication: {message}")]
    Repository { message: String },

    /// Configuration errors
    #[error("Authentication configuration error: {message}")]
    Configuration { message: String },

    /// Password hashing errors
    #[error("Cryptographic error: {message}")]
    Cryptographic { message: String },
}

impl AuthError {
    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::RejectedLockedOut { .. } => "REJECTED_LOCKED_OUT",
            AuthError::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            AuthError::Repository { .. } => "REPOSITORY_ERROR",
            AuthError::Configuration { .. } => "CONFIGURATION_ERROR",
            AuthError::Cryptographic { .. } => "CRYPTOGRAPHIC_ERROR",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::RejectedLockedOut { .. } => 429, // Too Many Requests
            AuthError::AuthenticationFailed { .. } => 401,
            AuthError::Repository { .. } => 500,
            AuthError::Configuration { .. } => 500,
            AuthError::Cryptographic { .. } => 500,
        }
    }

    /// Whether the caller must present a human-verification challenge
    pub fn requires_challenge(&self) -> bool {
        match self {
            AuthError::RejectedLockedOut { challenge_required }
            | AuthError::AuthenticationFailed { challenge_required } => *challenge_required,
            _ => false,
        }
    }

    /// Whether this is an expected, user-facing login failure
    pub fn is_login_failure(&self) -> bool {
        matches!(
            self,
            AuthError::RejectedLockedOut { .. } | AuthError::AuthenticationFailed { .. }
        )
    }

    /// Create a locked-out error
    pub fn locked_out(challenge_required: bool) -> Self {
        Self::RejectedLockedOut { challenge_required }
    }

    /// Create an authentication failed error
    pub fn authentication_failed(challenge_required: bool) -> Self {
        Self::AuthenticationFailed { challenge_required }
    }

    /// Create a repository error
    pub fn repository_error(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a cryptographic error
    pub fn crypto_error(message: impl Into<String>) -> Self {
        Self::Cryptographic {
            message: message.into(),
        }
    }
}

/// Errors raised while loading the authenticator configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Failed to parse configuration: {message}")]
    Parse { message: String },
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        Self::config_error(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "argon2")]
impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::crypto_error(err.to_string())
    }
}

#[cfg(feature = "bcrypt")]
impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::crypto_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AuthError::locked_out(false).error_code(),
            "REJECTED_LOCKED_OUT"
        );
        assert_eq!(
            AuthError::authentication_failed(true).error_code(),
            "AUTHENTICATION_FAILED"
        );
        assert_eq!(
            AuthError::repository_error("down").error_code(),
            "REPOSITORY_ERROR"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::locked_out(true).status_code(), 429);
        assert_eq!(AuthError::authentication_failed(false).status_code(), 401);
        assert_eq!(AuthError::config_error("test").status_code(), 500);
    }

    #[test]
    fn test_challenge_context() {
        assert!(AuthError::locked_out(true).requires_challenge());
        assert!(!AuthError::locked_out(false).requires_challenge());
        assert!(AuthError::authentication_failed(true).requires_challenge());
        assert!(!AuthError::repository_error("x").requires_challenge());
    }

    #[test]
    fn test_login_failure_classification() {
        assert!(AuthError::locked_out(false).is_login_failure());
        assert!(AuthError::authentication_failed(false).is_login_failure());
        assert!(!AuthError::crypto_error("bad hash").is_login_failure());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: AuthError = ConfigError::InvalidValue {
            field: "window_minutes".to_string(),
            value: "abc".to_string(),
            expected: "a non-negative integer".to_string(),
        }
        .into();

        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(err.to_string().contains("window_minutes"));
    }

    #[test]
    fn test_error_display() {
        let err = AuthError::repository_error("connection refused");
        assert_eq!(
            err.to_string(),
            "Repository error during authentication: connection refused"
        );
    }
}
