//! Credential verification and post-login bookkeeping

use crate::identity::Identity;
use crate::traits::UserRepository;
use crate::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of checking a username/password pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// No such user, or the account is disabled
    UserNotFoundOrInactive,

    /// The user exists but the password does not match
    WrongPassword,

    /// Credentials are valid; roles and groups are not attached yet
    Success(Identity),
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationResult::Success(_))
    }
}

/// Post-login writes that may fail without failing the login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookkeepingTask {
    /// Reading the password expiry or flagging the reset
    PasswordExpiry,

    /// Pushing back the account expiration date
    ExpirationDate,
}

impl fmt::Display for BookkeepingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookkeepingTask::PasswordExpiry => write!(f, "password expiry check"),
            BookkeepingTask::ExpirationDate => write!(f, "expiration date update"),
        }
    }
}

/// A bookkeeping write that failed after a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookkeepingFailure {
    pub task: BookkeepingTask,
    pub error: AuthError,
}

/// Checks credentials against a [`UserRepository`]
#[derive(Debug, Clone)]
pub struct CredentialVerifier<U> {
    users: U,
}

impl<U> CredentialVerifier<U>
where
    U: UserRepository,
{
    pub fn new(users: U) -> Self {
        Self { users }
    }

    /// Get the underlying user repository
    pub fn repository(&self) -> &U {
        &self.users
    }

    /// Verify a username/password pair.
    ///
    /// Unknown or inactive users are turned away before the password is
    /// looked at.
    pub async fn verify(&self, username: &str, password: &str) -> AuthResult<VerificationResult> {
        let Some(identity) = self.users.find_by_username(username).await? else {
            tracing::info!(username, "Unable to find user in the repository");
            return Ok(VerificationResult::UserNotFoundOrInactive);
        };

        if !self.users.is_active(username).await? {
            tracing::info!(username, "User account is inactive");
            return Ok(VerificationResult::UserNotFoundOrInactive);
        }

        if !self.users.check_password(username, password).await? {
            tracing::info!(username, "Incorrect login or password");
            return Ok(VerificationResult::WrongPassword);
        }

        Ok(VerificationResult::Success(identity))
    }

    /// Apply the writes that follow a successful login.
    ///
    /// Each write runs regardless of the others; failures are logged and
    /// returned, never propagated.
    pub async fn apply_post_login(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Vec<BookkeepingFailure> {
        let mut failures = Vec::new();

        if let Err(error) = self.flag_expired_password(username, now).await {
            failures.push(BookkeepingFailure {
                task: BookkeepingTask::PasswordExpiry,
                error,
            });
        }

        if let Err(error) = self.users.update_expiration_date(username, now).await {
            failures.push(BookkeepingFailure {
                task: BookkeepingTask::ExpirationDate,
                error,
            });
        }

        for failure in &failures {
            tracing::warn!(
                username,
                task = %failure.task,
                error = %failure.error,
                "Post-login bookkeeping failed"
            );
        }

        failures
    }

    async fn flag_expired_password(&self, username: &str, now: DateTime<Utc>) -> AuthResult<()> {
        match self.users.find_password_expiry_of(username).await? {
            Some(expires_at) if expires_at < now => {
                tracing::debug!(username, %expires_at, "Password expired, flagging reset");
                self.users.flag_password_reset_required(username).await
            }
            _ => Ok(()),
        }
    }
}
