//! Login orchestration
//!
//! The throttle is consulted before any credential is checked, so an origin
//! over the reject threshold learns nothing about the password it sent. Only
//! a failed verification is written to the ledger; a throttle reject is a
//! pure read of the existing history.

use crate::config::{AuthenticatorConfig, SecurityConfig, SecurityPolicy};
use crate::identity::Identity;
use crate::ledger::InMemoryAttemptLedger;
use crate::policy::{ChallengePolicy, ThrottleDecision};
use crate::roles::RoleResolver;
use crate::traits::{AttemptLedger, AuthenticationService, GroupRoleRepository, UserRepository};
use crate::verifier::{BookkeepingFailure, CredentialVerifier, VerificationResult};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Default name reported by [`Authenticator::service_name`]
pub const DEFAULT_SERVICE_NAME: &str = "warden-database";

/// HTTP authentication scheme of this service
pub const AUTH_TYPE: &str = "BASIC";

/// Login input as received by a host integration
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,

    /// Network origin the request claims to come from
    pub origin: String,

    /// Overrides the configured challenge availability when set
    #[serde(default)]
    pub challenge_available: Option<bool>,
}

impl LoginRequest {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            origin: origin.into(),
            challenge_available: None,
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("origin", &self.origin)
            .field("challenge_available", &self.challenge_available)
            .finish()
    }
}

/// Successful login together with what happened on the way
#[derive(Debug, Clone)]
pub struct LoginReport {
    /// The authenticated identity with roles and groups attached
    pub identity: Identity,

    /// Throttle decision the attempt went through
    pub decision: ThrottleDecision,

    /// Bookkeeping writes that failed without failing the login
    pub bookkeeping_failures: Vec<BookkeepingFailure>,
}

impl LoginReport {
    /// Whether any post-login bookkeeping failed
    pub fn is_degraded(&self) -> bool {
        !self.bookkeeping_failures.is_empty()
    }
}

/// Credential authenticator with brute-force throttling
#[derive(Debug, Clone)]
pub struct Authenticator<U, G, L, C> {
    verifier: CredentialVerifier<U>,
    roles: RoleResolver<G>,
    ledger: L,
    config: C,
    service_name: String,
}

impl<U, G, L, C> Authenticator<U, G, L, C>
where
    U: UserRepository,
    G: GroupRoleRepository,
    L: AttemptLedger,
    C: SecurityConfig,
{
    /// Create an authenticator over its collaborators
    pub fn new(users: U, groups: G, ledger: L, config: C) -> Self {
        Self {
            verifier: CredentialVerifier::new(users),
            roles: RoleResolver::new(groups),
            ledger,
            config,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }

    /// Set the name reported by [`Authenticator::service_name`]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Authenticate a username/password pair coming from `origin`.
    ///
    /// Fails with [`AuthError::RejectedLockedOut`] when the origin is over the
    /// reject threshold and with [`AuthError::AuthenticationFailed`] when the
    /// credentials do not check out.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        origin: &str,
        now: DateTime<Utc>,
        challenge_available: bool,
    ) -> AuthResult<Identity> {
        self.login_with_report(username, password, origin, now, challenge_available)
            .await
            .map(|report| report.identity)
    }

    /// [`Authenticator::login`] with challenge availability read from the config
    pub async fn login_default(
        &self,
        username: &str,
        password: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Identity> {
        let challenge_available = self.config.challenge_enabled();
        self.login(username, password, origin, now, challenge_available)
            .await
    }

    /// Same as [`Authenticator::login`], also reporting the throttle decision
    /// and any bookkeeping failures
    pub async fn login_with_report(
        &self,
        username: &str,
        password: &str,
        origin: &str,
        now: DateTime<Utc>,
        challenge_available: bool,
    ) -> AuthResult<LoginReport> {
        let decision = self.throttle(origin, now, challenge_available).await?;

        if let ThrottleDecision::Reject { challenge_required } = decision {
            tracing::warn!(
                origin,
                username,
                challenge_required,
                "Login rejected: too many failed attempts"
            );
            return Err(AuthError::locked_out(challenge_required));
        }

        let mut identity = match self.verifier.verify(username, password).await? {
            VerificationResult::Success(identity) => identity,
            VerificationResult::UserNotFoundOrInactive | VerificationResult::WrongPassword => {
                self.record_failure(origin, now).await;
                return Err(AuthError::authentication_failed(
                    decision.challenge_required(),
                ));
            }
        };

        let users = self.verifier.repository();
        let roles = users.find_roles_of(username).await?;
        let groups = users.find_groups_of(username).await?;
        identity.attach(roles, groups);

        let bookkeeping_failures = self.verifier.apply_post_login(username, now).await;

        tracing::debug!(
            origin,
            username,
            roles = identity.roles.len(),
            groups = identity.groups.len(),
            "Login succeeded"
        );

        Ok(LoginReport {
            identity,
            decision,
            bookkeeping_failures,
        })
    }

    /// Look up a user without any throttling
    pub async fn get_user(&self, username: &str) -> AuthResult<Option<Identity>> {
        self.verifier.repository().find_by_username(username).await
    }

    /// Every user managed by the repository
    pub async fn get_users(&self) -> AuthResult<Vec<Identity>> {
        self.verifier.repository().find_all().await
    }

    /// Check if the identity holds `role`, directly or through a group
    pub async fn is_user_in_role(&self, identity: &Identity, role: &str) -> AuthResult<bool> {
        self.roles.has_role(identity, role).await
    }

    /// Effective roles of the identity, sorted
    pub async fn roles_for(&self, identity: &Identity) -> AuthResult<Vec<String>> {
        self.roles.sorted_roles(identity).await
    }

    /// Record the time of the identity's last login
    pub async fn update_last_login(&self, identity: &Identity, now: DateTime<Utc>) -> AuthResult<()> {
        self.verifier
            .repository()
            .update_last_login_timestamp(&identity.username, now)
            .await
    }

    /// Whether the account has been flagged to change its password
    pub async fn find_reset_password(&self, username: &str) -> AuthResult<bool> {
        self.verifier
            .repository()
            .is_password_reset_required(username)
            .await
    }

    /// End the identity's session; nothing to clean up at this level
    pub fn logout(&self, _identity: &Identity) {}

    /// The anonymous identity
    pub fn anonymous_user(&self) -> Identity {
        Identity::anonymous()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn auth_type(&self) -> &'static str {
        AUTH_TYPE
    }

    /// Current throttle thresholds
    pub fn security_policy(&self) -> SecurityPolicy {
        self.config.policy()
    }

    /// Get the failed-attempt ledger
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    async fn throttle(
        &self,
        origin: &str,
        now: DateTime<Utc>,
        challenge_available: bool,
    ) -> AuthResult<ThrottleDecision> {
        let policy = ChallengePolicy::new(self.config.policy(), challenge_available);
        if !policy.is_active() {
            return Ok(ThrottleDecision::Allow);
        }

        let failures = self
            .ledger
            .count_recent_failures(origin, policy.policy().window(), now)
            .await?;
        let decision = policy.decide(failures);

        tracing::debug!(origin, failures, ?decision, "Throttle evaluated");
        Ok(decision)
    }

    async fn record_failure(&self, origin: &str, now: DateTime<Utc>) {
        // The login outcome stays a plain failure even if the write is lost
        if let Err(error) = self.ledger.record_failure(origin, now).await {
            tracing::warn!(origin, %error, "Failed to record failed login attempt");
        }
    }
}

impl<U, G> Authenticator<U, G, InMemoryAttemptLedger, AuthenticatorConfig>
where
    U: UserRepository,
    G: GroupRoleRepository,
{
    /// Build an authenticator with an in-memory ledger sized from `config`
    pub fn from_config(users: U, groups: G, config: AuthenticatorConfig) -> AuthResult<Self> {
        config.validate()?;

        let ledger = InMemoryAttemptLedger::with_retention(config.ledger_retention());
        let service_name = config.service_name.clone();
        Ok(Self::new(users, groups, ledger, config).with_service_name(service_name))
    }
}

#[async_trait]
impl<U, G, L, C> AuthenticationService for Authenticator<U, G, L, C>
where
    U: UserRepository,
    G: GroupRoleRepository,
    L: AttemptLedger,
    C: SecurityConfig,
{
    async fn login(&self, request: &LoginRequest) -> AuthResult<Identity> {
        let challenge_available = request
            .challenge_available
            .unwrap_or_else(|| self.config.challenge_enabled());

        Authenticator::login(
            self,
            &request.username,
            &request.password,
            &request.origin,
            Utc::now(),
            challenge_available,
        )
        .await
    }

    async fn logout(&self, identity: &Identity) {
        Authenticator::logout(self, identity)
    }

    async fn is_user_in_role(&self, identity: &Identity, role: &str) -> AuthResult<bool> {
        Authenticator::is_user_in_role(self, identity, role).await
    }

    async fn get_user(&self, username: &str) -> AuthResult<Option<Identity>> {
        Authenticator::get_user(self, username).await
    }

    async fn get_users(&self) -> AuthResult<Vec<Identity>> {
        Authenticator::get_users(self).await
    }

    async fn update_last_login(&self, identity: &Identity) -> AuthResult<()> {
        Authenticator::update_last_login(self, identity, Utc::now()).await
    }

    fn anonymous_user(&self) -> Identity {
        Identity::anonymous()
    }

    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn auth_type(&self) -> &str {
        AUTH_TYPE
    }
}

#[cfg(all(test, feature = "bcrypt"))]
mod tests {
    use super::*;
    use crate::config::AuthenticatorConfig;
    use crate::hashing::BcryptHasher;
    use crate::ledger::InMemoryAttemptLedger;
    use crate::memory::{InMemoryGroupRoleRepository, InMemoryUserRepository, UserRecord};
    use chrono::{Duration, TimeZone};

    type TestAuthenticator = Authenticator<
        InMemoryUserRepository,
        InMemoryGroupRoleRepository,
        InMemoryAttemptLedger,
        AuthenticatorConfig,
    >;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn authenticator(config: AuthenticatorConfig) -> TestAuthenticator {
        let users = InMemoryUserRepository::new(BcryptHasher::development());
        users
            .add_user(
                UserRecord::new("alice")
                    .with_roles(["EDITOR"])
                    .with_groups(["g1"]),
                "s3cret",
            )
            .unwrap();

        let groups = InMemoryGroupRoleRepository::new();
        groups.grant("g1", ["REVIEWER", "EDITOR"]);

        Authenticator::new(users, groups, InMemoryAttemptLedger::new(), config)
    }

    async fn seed_failures(auth: &TestAuthenticator, origin: &str, count: usize) {
        for i in 0..count {
            auth.ledger()
                .record_failure(origin, now() - Duration::minutes(i as i64 % 10))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_successful_login_attaches_roles_and_groups() {
        let auth = authenticator(AuthenticatorConfig::production());

        let identity = auth
            .login("alice", "s3cret", "10.0.0.1", now(), true)
            .await
            .unwrap();

        assert!(identity.roles.contains("EDITOR"));
        assert!(identity.groups.contains("g1"));
        assert!(auth.is_user_in_role(&identity, "REVIEWER").await.unwrap());
        assert!(!auth.is_user_in_role(&identity, "ADMIN").await.unwrap());
        assert_eq!(
            auth.roles_for(&identity).await.unwrap(),
            vec!["EDITOR".to_string(), "REVIEWER".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_login_is_recorded() {
        let auth = authenticator(AuthenticatorConfig::production());

        let err = auth
            .login("alice", "guess", "10.0.0.1", now(), true)
            .await
            .unwrap_err();

        assert_eq!(err, AuthError::authentication_failed(false));
        assert_eq!(auth.ledger().records("10.0.0.1").len(), 1);
    }

    #[tokio::test]
    async fn test_reject_does_not_touch_ledger_or_credentials() {
        let auth = authenticator(AuthenticatorConfig::production());
        seed_failures(&auth, "10.0.0.9", 6).await;

        // Even the right password is refused
        let err = auth
            .login("alice", "s3cret", "10.0.0.9", now(), true)
            .await
            .unwrap_err();

        assert_eq!(err, AuthError::locked_out(true));
        assert_eq!(auth.ledger().records("10.0.0.9").len(), 6);
    }

    #[tokio::test]
    async fn test_challenge_context_on_failure() {
        let auth = authenticator(AuthenticatorConfig::production());
        seed_failures(&auth, "10.0.0.5", 3).await;

        let err = auth
            .login("alice", "guess", "10.0.0.5", now(), true)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::authentication_failed(true));

        let report = auth
            .login_with_report("alice", "s3cret", "10.0.0.5", now(), true)
            .await
            .unwrap();
        assert_eq!(report.decision, ThrottleDecision::Challenge);
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn test_login_default_reads_challenge_flag() {
        let mut config = AuthenticatorConfig::production();
        config.challenge_enabled = false;
        let auth = authenticator(config);
        seed_failures(&auth, "10.0.0.7", 6).await;

        let err = auth
            .login_default("alice", "s3cret", "10.0.0.7", now())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::locked_out(false));
    }

    #[tokio::test]
    async fn test_passthroughs() {
        let auth = authenticator(AuthenticatorConfig::default()).with_service_name("portal");

        assert!(auth.get_user("alice").await.unwrap().is_some());
        assert!(auth.get_user("nobody").await.unwrap().is_none());
        assert_eq!(auth.get_users().await.unwrap().len(), 1);
        assert!(!auth.find_reset_password("alice").await.unwrap());

        let alice = auth.get_user("alice").await.unwrap().unwrap();
        auth.update_last_login(&alice, now()).await.unwrap();
        auth.logout(&alice);

        assert!(auth.anonymous_user().is_anonymous());
        assert_eq!(auth.service_name(), "portal");
        assert_eq!(auth.auth_type(), "BASIC");
        assert!(!auth.security_policy().throttle_active());
    }

    #[test]
    fn test_from_config_validates() {
        let users = InMemoryUserRepository::new(BcryptHasher::development());
        let groups = InMemoryGroupRoleRepository::new();

        let mut config = AuthenticatorConfig::production();
        config.service_name = "intranet".to_string();
        let auth = Authenticator::from_config(users.clone(), groups.clone(), config).unwrap();
        assert_eq!(auth.service_name(), "intranet");

        let mut config = AuthenticatorConfig::production();
        config.ledger_retention_minutes = 5;
        assert!(Authenticator::from_config(users, groups, config).is_err());
    }

    #[test]
    fn test_login_request_debug_redacts_password() {
        let request = LoginRequest::new("alice", "hunter2", "10.0.0.1");
        let debug = format!("{:?}", request);

        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
