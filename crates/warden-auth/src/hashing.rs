//! Password hashers used by the bundled in-memory user repository

use crate::{AuthError, AuthResult, PasswordHasher};

#[cfg(feature = "argon2")]
use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
#[cfg(feature = "argon2")]
use rand::thread_rng;

/// Argon2id password hasher
#[cfg(feature = "argon2")]
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

#[cfg(feature = "argon2")]
impl Argon2Hasher {
    /// Create a new Argon2 hasher with custom parameters
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Create an Argon2 hasher optimized for production
    pub fn production() -> Self {
        Self::new(65536, 4, 4) // 64 MB, 4 iterations
    }

    /// Create an Argon2 hasher optimized for development (faster)
    pub fn development() -> Self {
        Self::new(4096, 2, 2) // 4 MB, 2 iterations
    }

    fn argon2(&self) -> AuthResult<Argon2<'static>> {
        let params = argon2::Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| AuthError::crypto_error(e.to_string()))?;

        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

#[cfg(feature = "argon2")]
impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(65536, 3, 4)
    }
}

#[cfg(feature = "argon2")]
impl PasswordHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut thread_rng());
        let password_hash = self.argon2()?.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let parsed_hash = PasswordHash::new(hash)?;

        match self
            .argon2()?
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    fn hasher_name(&self) -> &str {
        "argon2"
    }
}

/// bcrypt password hasher
#[cfg(feature = "bcrypt")]
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

#[cfg(feature = "bcrypt")]
impl BcryptHasher {
    /// Create a new bcrypt hasher with custom cost
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Create a bcrypt hasher optimized for development (faster)
    pub fn development() -> Self {
        Self { cost: 4 }
    }
}

#[cfg(feature = "bcrypt")]
impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[cfg(feature = "bcrypt")]
impl PasswordHasher for BcryptHasher {
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }

    fn hasher_name(&self) -> &str {
        "bcrypt"
    }
}

/// Create a hasher by algorithm name
pub fn hasher_by_name(algorithm: &str) -> AuthResult<Box<dyn PasswordHasher>> {
    match algorithm {
        #[cfg(feature = "argon2")]
        "argon2" => Ok(Box::new(Argon2Hasher::default())),
        #[cfg(feature = "bcrypt")]
        "bcrypt" => Ok(Box::new(BcryptHasher::default())),
        _ => Err(AuthError::config_error(format!(
            "Unknown password hashing algorithm: {} (or feature not enabled)",
            algorithm
        ))),
    }
}

/// Default hasher: Argon2 when available, bcrypt otherwise
pub fn default_hasher() -> AuthResult<Box<dyn PasswordHasher>> {
    if cfg!(feature = "argon2") {
        hasher_by_name("argon2")
    } else {
        hasher_by_name("bcrypt")
    }
}
