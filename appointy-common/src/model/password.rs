use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use serde::{Deserialize, Deserializer, de::Error as _};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_SALT_LEN: usize = 16;
pub const DEFAULT_PASSWORD_MIN_LEN: usize = 1;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The stored password hash is not a valid PHC string")]
pub struct InvalidPasswordHashError;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Password must be at least {min_len} characters long")]
pub struct WeakPasswordError {
    pub min_len: usize,
}

/// A plaintext password as received from a client.
#[derive(Clone, Eq, PartialEq)]
pub struct Password(String);

/// Argon2id hash of a password in PHC string format, salt included.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordHash(String);

/// Minimum requirements a password must meet before it is hashed.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PasswordPolicy {
    pub min_len: usize,
}

impl Password {
    #[must_use]
    pub fn new(password: String) -> Self {
        Self(password)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Hashes with a fresh random salt. CPU and memory heavy; keep off the async executor.
    pub fn hash(&self) -> Result<PasswordHash, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let hash = Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(PasswordHash(hash.to_string()))
    }
}

impl PasswordHash {
    pub fn new(phc: String) -> Result<Self, InvalidPasswordHashError> {
        password_hash::PasswordHash::new(&phc).map_err(|_| InvalidPasswordHashError)?;
        Ok(Self(phc))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        password_hash::PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.0.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

impl PasswordPolicy {
    pub fn check(self, password: &Password) -> Result<(), WeakPasswordError> {
        if password.0.chars().count() < self.min_len {
            return Err(WeakPasswordError {
                min_len: self.min_len,
            });
        }

        Ok(())
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_PASSWORD_MIN_LEN,
        }
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The rejected value must not end up in an error message.
        String::deserialize(deserializer)
            .map(Self)
            .map_err(|_| D::Error::custom("password must be a string"))
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[redacted]").finish()
    }
}
