//! # warden-auth: credential login with brute-force throttling
//!
//! Authenticates username/password pairs against a pluggable user store,
//! throttles origins that accumulate failed attempts inside a sliding
//! window, escalates to a human-verification challenge before refusing
//! outright, and resolves effective roles through group membership.
//!
//! ```no_run
//! use warden_auth::hashing::Argon2Hasher;
//! use warden_auth::memory::{InMemoryGroupRoleRepository, InMemoryUserRepository, UserRecord};
//! use warden_auth::{Authenticator, AuthenticatorConfig};
//!
//! # async fn run() -> warden_auth::AuthResult<()> {
//! let users = InMemoryUserRepository::new(Argon2Hasher::production());
//! users.add_user(UserRecord::new("alice").with_roles(["EDITOR"]), "s3cret")?;
//!
//! let auth = Authenticator::from_config(
//!     users,
//!     InMemoryGroupRoleRepository::new(),
//!     AuthenticatorConfig::production(),
//! )?;
//!
//! let identity = auth
//!     .login("alice", "s3cret", "203.0.113.7", chrono::Utc::now(), true)
//!     .await?;
//! assert!(auth.is_user_in_role(&identity, "EDITOR").await?);
//! # Ok(())
//! # }
//! ```

pub mod authenticator;
pub mod config;
pub mod error;
pub mod hashing;
pub mod identity;
pub mod ledger;
pub mod logging;
pub mod memory;
pub mod policy;
pub mod roles;
pub mod traits;
pub mod verifier;

// Error handling
pub use error::{AuthError, ConfigError};

// Collaborator traits
pub use traits::{
    AttemptLedger, AuthenticationService, GroupRoleRepository, PasswordHasher, UserRepository,
};

// Configuration
pub use config::{AuthenticatorConfig, SecurityConfig, SecurityPolicy, SharedSecurityConfig};

// Core types
pub use authenticator::{Authenticator, LoginReport, LoginRequest};
pub use identity::Identity;
pub use ledger::InMemoryAttemptLedger;
pub use policy::{ChallengePolicy, ThrottleDecision};
pub use roles::RoleResolver;
pub use verifier::{BookkeepingFailure, BookkeepingTask, CredentialVerifier, VerificationResult};

// Logging
pub use logging::{init_logging, LoggingConfig};

/// Authentication result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
