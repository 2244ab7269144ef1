//! Authenticator configuration types and providers

use crate::error::ConfigError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

/// Environment variable names read by [`AuthenticatorConfig::from_env`]
pub const ENV_SERVICE_NAME: &str = "WARDEN_SERVICE_NAME";
pub const ENV_ACCESS_FAILURES_MAX: &str = "WARDEN_ACCESS_FAILURES_MAX";
pub const ENV_ACCESS_FAILURES_CAPTCHA: &str = "WARDEN_ACCESS_FAILURES_CAPTCHA";
pub const ENV_ACCESS_FAILURES_INTERVAL: &str = "WARDEN_ACCESS_FAILURES_INTERVAL";
pub const ENV_CAPTCHA_ENABLED: &str = "WARDEN_CAPTCHA_ENABLED";
pub const ENV_LEDGER_RETENTION_MINUTES: &str = "WARDEN_LEDGER_RETENTION_MINUTES";

/// Brute-force throttle thresholds
///
/// A zero value disables the corresponding check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SecurityPolicy {
    /// Failures tolerated before attempts are refused outright
    #[serde(default)]
    pub max_failures_before_reject: u32,

    /// Failures after which a human-verification challenge is required
    #[serde(default)]
    pub max_failures_before_challenge: u32,

    /// Length of the trailing window failures are counted over
    #[serde(default)]
    pub window_minutes: u32,
}

impl SecurityPolicy {
    pub fn new(
        max_failures_before_reject: u32,
        max_failures_before_challenge: u32,
        window_minutes: u32,
    ) -> Self {
        Self {
            max_failures_before_reject,
            max_failures_before_challenge,
            window_minutes,
        }
    }

    /// A policy with every check disabled
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether failure history is consulted at all
    pub fn throttle_active(&self) -> bool {
        self.window_minutes > 0
            && (self.max_failures_before_reject > 0 || self.max_failures_before_challenge > 0)
    }

    /// The counting window as a duration
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.window_minutes))
    }
}

/// Main authenticator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatorConfig {
    /// Name of the authentication service, shown to operators
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Throttle thresholds
    #[serde(default)]
    pub security: SecurityPolicy,

    /// Whether a challenge mechanism is installed in this deployment
    #[serde(default = "default_false")]
    pub challenge_enabled: bool,

    /// How long the in-memory ledger keeps failure records
    #[serde(default = "default_ledger_retention_minutes")]
    pub ledger_retention_minutes: u32,
}

// Default value functions
fn default_service_name() -> String {
    crate::authenticator::DEFAULT_SERVICE_NAME.to_string()
}
fn default_false() -> bool {
    false
}
fn default_ledger_retention_minutes() -> u32 {
    24 * 60
} // 24 hours

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            security: SecurityPolicy::default(),
            challenge_enabled: default_false(),
            ledger_retention_minutes: default_ledger_retention_minutes(),
        }
    }
}

impl AuthenticatorConfig {
    /// Create a development configuration with the throttle switched off
    pub fn development() -> Self {
        Self::default()
    }

    /// Create a production configuration with challenge escalation enabled
    pub fn production() -> Self {
        Self {
            security: SecurityPolicy::new(5, 3, 15),
            challenge_enabled: true,
            ..Self::default()
        }
    }

    /// Parse a JSON document; absent fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Missing keys keep their default; values that do not parse are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_SERVICE_NAME) {
            config.service_name = name;
        }

        if let Some(value) = parse_u32(&lookup, ENV_ACCESS_FAILURES_MAX)? {
            config.security.max_failures_before_reject = value;
        }
        if let Some(value) = parse_u32(&lookup, ENV_ACCESS_FAILURES_CAPTCHA)? {
            config.security.max_failures_before_challenge = value;
        }
        if let Some(value) = parse_u32(&lookup, ENV_ACCESS_FAILURES_INTERVAL)? {
            config.security.window_minutes = value;
        }
        if let Some(value) = parse_u32(&lookup, ENV_LEDGER_RETENTION_MINUTES)? {
            config.ledger_retention_minutes = value;
        }

        if let Some(raw) = lookup(ENV_CAPTCHA_ENABLED) {
            config.challenge_enabled = match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_CAPTCHA_ENABLED.to_string(),
                        value: raw,
                        expected: "a boolean (true/false)".to_string(),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service_name".to_string(),
                value: self.service_name.clone(),
                expected: "a non-empty name".to_string(),
            });
        }

        // Records the window still needs must survive pruning
        if self.security.throttle_active()
            && self.ledger_retention_minutes < self.security.window_minutes
        {
            return Err(ConfigError::InvalidValue {
                field: "ledger_retention_minutes".to_string(),
                value: self.ledger_retention_minutes.to_string(),
                expected: format!(
                    "at least the throttle window ({} minutes)",
                    self.security.window_minutes
                ),
            });
        }

        Ok(())
    }

    /// Retention horizon of the in-memory ledger
    pub fn ledger_retention(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.ledger_retention_minutes))
    }
}

fn parse_u32<F>(lookup: &F, key: &str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw,
                expected: "a non-negative integer".to_string(),
            }),
    }
}

/// Read-only source of the throttle settings, consulted on every login
pub trait SecurityConfig: Send + Sync {
    /// Current throttle thresholds
    fn policy(&self) -> SecurityPolicy;

    /// Whether a challenge mechanism is currently enabled
    fn challenge_enabled(&self) -> bool;
}

impl SecurityConfig for AuthenticatorConfig {
    fn policy(&self) -> SecurityPolicy {
        self.security
    }

    fn challenge_enabled(&self) -> bool {
        self.challenge_enabled
    }
}

impl<T: SecurityConfig + ?Sized> SecurityConfig for Arc<T> {
    fn policy(&self) -> SecurityPolicy {
        (**self).policy()
    }

    fn challenge_enabled(&self) -> bool {
        (**self).challenge_enabled()
    }
}

/// Configuration holder that operators can update while logins are served
#[derive(Debug, Clone, Default)]
pub struct SharedSecurityConfig {
    inner: Arc<RwLock<AuthenticatorConfig>>,
}

impl SharedSecurityConfig {
    pub fn new(config: AuthenticatorConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Replace the throttle thresholds
    pub fn set_policy(&self, policy: SecurityPolicy) {
        self.inner.write().security = policy;
    }

    /// Toggle challenge availability
    pub fn set_challenge_enabled(&self, enabled: bool) {
        self.inner.write().challenge_enabled = enabled;
    }

    /// Snapshot of the full configuration
    pub fn snapshot(&self) -> AuthenticatorConfig {
        self.inner.read().clone()
    }
}

impl SecurityConfig for SharedSecurityConfig {
    fn policy(&self) -> SecurityPolicy {
        self.inner.read().security
    }

    fn challenge_enabled(&self) -> bool {
        self.inner.read().challenge_enabled
    }
}
