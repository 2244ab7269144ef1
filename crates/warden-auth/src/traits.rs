//! Collaborator traits consumed by the authenticator

use crate::authenticator::LoginRequest;
use crate::identity::Identity;
use crate::AuthResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Storage of user records.
///
/// The authenticator never sees password material; it only asks the
/// repository whether a plaintext password matches what is stored.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user by login
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Identity>>;

    /// Every user managed by this repository
    async fn find_all(&self) -> AuthResult<Vec<Identity>>;

    /// Check if the user account is active
    async fn is_active(&self, username: &str) -> AuthResult<bool>;

    /// Verify a plaintext password against the stored credential
    async fn check_password(&self, username: &str, password: &str) -> AuthResult<bool>;

    /// Roles assigned directly to the user
    async fn find_roles_of(&self, username: &str) -> AuthResult<HashSet<String>>;

    /// Groups the user belongs to
    async fn find_groups_of(&self, username: &str) -> AuthResult<HashSet<String>>;

    /// Instant after which the password is no longer valid
    async fn find_password_expiry_of(&self, username: &str) -> AuthResult<Option<DateTime<Utc>>>;

    /// Mark the account as having to change its password
    async fn flag_password_reset_required(&self, username: &str) -> AuthResult<()>;

    /// Whether the account has to change its password
    async fn is_password_reset_required(&self, username: &str) -> AuthResult<bool>;

    /// Push back the account's inactivity expiration
    async fn update_expiration_date(&self, username: &str, now: DateTime<Utc>) -> AuthResult<()>;

    /// Record the time of the last successful login
    async fn update_last_login_timestamp(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()>;
}

/// Read-only group to role mapping
#[async_trait]
pub trait GroupRoleRepository: Send + Sync {
    /// Roles granted to members of a group
    async fn find_roles_for_group(&self, group_id: &str) -> AuthResult<HashSet<String>>;
}

/// Failed-attempt history keyed by client origin
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    /// Append one failed attempt
    async fn record_failure(&self, origin: &str, timestamp: DateTime<Utc>) -> AuthResult<()>;

    /// Failures from `origin` no older than `window` before `now`
    async fn count_recent_failures(
        &self,
        origin: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<u32>;
}

/// Password hasher trait for different hashing algorithms
pub trait PasswordHasher: Send + Sync {
    /// Hash a password
    fn hash_password(&self, password: &str) -> AuthResult<String>;

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool>;

    /// Get the hasher name
    fn hasher_name(&self) -> &str;
}

/// Authentication entry points exposed to a hosting framework
#[async_trait]
pub trait AuthenticationService: Send + Sync {
    /// Authenticate the request at the current instant
    async fn login(&self, request: &LoginRequest) -> AuthResult<Identity>;

    async fn logout(&self, identity: &Identity);

    /// Check if the identity holds a role, directly or through a group
    async fn is_user_in_role(&self, identity: &Identity, role: &str) -> AuthResult<bool>;

    async fn get_user(&self, username: &str) -> AuthResult<Option<Identity>>;

    async fn get_users(&self) -> AuthResult<Vec<Identity>>;

    /// Record the current instant as the identity's last login
    async fn update_last_login(&self, identity: &Identity) -> AuthResult<()>;

    fn anonymous_user(&self) -> Identity;

    fn service_name(&self) -> &str;

    /// Authentication scheme name, e.g. `BASIC`
    fn auth_type(&self) -> &str;
}

#[async_trait]
impl<T: UserRepository + ?Sized> UserRepository for Arc<T> {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Identity>> {
        (**self).find_by_username(username).await
    }

    async fn find_all(&self) -> AuthResult<Vec<Identity>> {
        (**self).find_all().await
    }

    async fn is_active(&self, username: &str) -> AuthResult<bool> {
        (**self).is_active(username).await
    }

    async fn check_password(&self, username: &str, password: &str) -> AuthResult<bool> {
        (**self).check_password(username, password).await
    }

    async fn find_roles_of(&self, username: &str) -> AuthResult<HashSet<String>> {
        (**self).find_roles_of(username).await
    }

    async fn find_groups_of(&self, username: &str) -> AuthResult<HashSet<String>> {
        (**self).find_groups_of(username).await
    }

    async fn find_password_expiry_of(&self, username: &str) -> AuthResult<Option<DateTime<Utc>>> {
        (**self).find_password_expiry_of(username).await
    }

    async fn flag_password_reset_required(&self, username: &str) -> AuthResult<()> {
        (**self).flag_password_reset_required(username).await
    }

    async fn is_password_reset_required(&self, username: &str) -> AuthResult<bool> {
        (**self).is_password_reset_required(username).await
    }

    async fn update_expiration_date(&self, username: &str, now: DateTime<Utc>) -> AuthResult<()> {
        (**self).update_expiration_date(username, now).await
    }

    async fn update_last_login_timestamp(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        (**self).update_last_login_timestamp(username, now).await
    }
}

#[async_trait]
impl<T: GroupRoleRepository + ?Sized> GroupRoleRepository for Arc<T> {
    async fn find_roles_for_group(&self, group_id: &str) -> AuthResult<HashSet<String>> {
        (**self).find_roles_for_group(group_id).await
    }
}

#[async_trait]
impl<T: AttemptLedger + ?Sized> AttemptLedger for Arc<T> {
    async fn record_failure(&self, origin: &str, timestamp: DateTime<Utc>) -> AuthResult<()> {
        (**self).record_failure(origin, timestamp).await
    }

    async fn count_recent_failures(
        &self,
        origin: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<u32> {
        (**self).count_recent_failures(origin, window, now).await
    }
}
