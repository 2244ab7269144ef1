//! In-memory user and group repositories for testing and simple deployments

use crate::identity::Identity;
use crate::traits::{GroupRoleRepository, PasswordHasher, UserRepository};
use crate::AuthResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// A stored user account
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub active: bool,
    pub roles: HashSet<String>,
    pub groups: HashSet<String>,

    /// Instant after which the password has to be changed
    pub password_expires_at: Option<DateTime<Utc>>,

    /// Whether the user has to change its password at next login
    pub reset_password: bool,

    /// How many times the reset flag was written
    pub reset_flag_writes: u32,

    pub last_login_at: Option<DateTime<Utc>>,

    /// Last time the inactivity expiration was pushed back
    pub last_activity_at: Option<DateTime<Utc>>,

    /// Instant after which an inactive account expires
    pub account_expires_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Create an active account without password, roles or groups
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: String::new(),
            active: true,
            roles: HashSet::new(),
            groups: HashSet::new(),
            password_expires_at: None,
            reset_password: false,
            reset_flag_writes: 0,
            last_login_at: None,
            last_activity_at: None,
            account_expires_at: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_password_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.password_expires_at = Some(expires_at);
        self
    }

    /// The identity as handed out by lookups: no roles or groups attached
    fn identity(&self) -> Identity {
        Identity::new(self.username.clone())
    }
}

/// User repository backed by a concurrent map
#[derive(Clone)]
pub struct InMemoryUserRepository {
    users: Arc<DashMap<String, UserRecord>>,
    hasher: Arc<dyn PasswordHasher>,
    account_lifetime: Option<Duration>,
}

impl std::fmt::Debug for InMemoryUserRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryUserRepository")
            .field("users", &self.users.len())
            .field("hasher", &self.hasher.hasher_name())
            .field("account_lifetime", &self.account_lifetime)
            .finish()
    }
}

impl InMemoryUserRepository {
    /// Create an empty repository hashing passwords with `hasher`
    pub fn new(hasher: impl PasswordHasher + 'static) -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            hasher: Arc::new(hasher),
            account_lifetime: None,
        }
    }

    /// Push account expiration `lifetime` ahead of every successful login
    pub fn with_account_lifetime(mut self, lifetime: Duration) -> Self {
        self.account_lifetime = Some(lifetime);
        self
    }

    /// Store a user, hashing its plaintext password
    pub fn add_user(&self, mut record: UserRecord, password: &str) -> AuthResult<()> {
        record.password_hash = self.hasher.hash_password(password)?;
        self.users.insert(record.username.clone(), record);
        Ok(())
    }

    /// Remove a user
    pub fn remove_user(&self, username: &str) -> Option<UserRecord> {
        self.users.remove(username).map(|(_, record)| record)
    }

    /// Snapshot of a stored record
    pub fn record(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).map(|record| record.value().clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn read<T>(&self, username: &str, f: impl FnOnce(&UserRecord) -> T) -> Option<T> {
        self.users.get(username).map(|record| f(record.value()))
    }

    fn write(&self, username: &str, f: impl FnOnce(&mut UserRecord)) {
        if let Some(mut record) = self.users.get_mut(username) {
            f(record.value_mut());
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Identity>> {
        Ok(self.read(username, UserRecord::identity))
    }

    async fn find_all(&self) -> AuthResult<Vec<Identity>> {
        let mut identities: Vec<Identity> = self
            .users
            .iter()
            .map(|entry| entry.value().identity())
            .collect();
        identities.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(identities)
    }

    async fn is_active(&self, username: &str) -> AuthResult<bool> {
        Ok(self.read(username, |record| record.active).unwrap_or(false))
    }

    async fn check_password(&self, username: &str, password: &str) -> AuthResult<bool> {
        // Clone the hash so no map guard is held while hashing
        let Some(hash) = self.read(username, |record| record.password_hash.clone()) else {
            return Ok(false);
        };
        if hash.is_empty() {
            return Ok(false);
        }
        self.hasher.verify_password(password, &hash)
    }

    async fn find_roles_of(&self, username: &str) -> AuthResult<HashSet<String>> {
        Ok(self
            .read(username, |record| record.roles.clone())
            .unwrap_or_default())
    }

    async fn find_groups_of(&self, username: &str) -> AuthResult<HashSet<String>> {
        Ok(self
            .read(username, |record| record.groups.clone())
            .unwrap_or_default())
    }

    async fn find_password_expiry_of(&self, username: &str) -> AuthResult<Option<DateTime<Utc>>> {
        Ok(self
            .read(username, |record| record.password_expires_at)
            .flatten())
    }

    async fn flag_password_reset_required(&self, username: &str) -> AuthResult<()> {
        self.write(username, |record| {
            record.reset_password = true;
            record.reset_flag_writes += 1;
        });
        Ok(())
    }

    async fn is_password_reset_required(&self, username: &str) -> AuthResult<bool> {
        Ok(self
            .read(username, |record| record.reset_password)
            .unwrap_or(false))
    }

    async fn update_expiration_date(&self, username: &str, now: DateTime<Utc>) -> AuthResult<()> {
        let lifetime = self.account_lifetime;
        self.write(username, |record| {
            record.last_activity_at = Some(now);
            record.account_expires_at = lifetime.map(|lifetime| now + lifetime);
        });
        Ok(())
    }

    async fn update_last_login_timestamp(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        self.write(username, |record| record.last_login_at = Some(now));
        Ok(())
    }
}

/// Group to role mapping backed by a concurrent map
#[derive(Debug, Clone, Default)]
pub struct InMemoryGroupRoleRepository {
    groups: Arc<DashMap<String, HashSet<String>>>,
}

impl InMemoryGroupRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant roles to a group
    pub fn grant<I, S>(&self, group_id: &str, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .entry(group_id.to_string())
            .or_default()
            .extend(roles.into_iter().map(Into::into));
    }

    /// Withdraw a role from a group
    pub fn revoke(&self, group_id: &str, role: &str) {
        if let Some(mut roles) = self.groups.get_mut(group_id) {
            roles.remove(role);
        }
    }
}

#[async_trait]
impl GroupRoleRepository for InMemoryGroupRoleRepository {
    async fn find_roles_for_group(&self, group_id: &str) -> AuthResult<HashSet<String>> {
        Ok(self
            .groups
            .get(group_id)
            .map(|roles| roles.value().clone())
            .unwrap_or_default())
    }
}
