//! Salted one-way password hashing (Argon2id).
//!
//! Hashing is deliberately slow, so both operations run on the blocking pool
//! instead of the async workers.

use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
};
use argon2::{Algorithm, Argon2, Params, Version};
use tokio::task;

use crate::error::AuthServiceError;

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHasher {
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    /// Produce a PHC-format hash string with a fresh random salt.
    pub async fn hash(&self, password: &str) -> Result<String, AuthServiceError> {
        let params = self.params.clone();
        let password = password.to_owned();
        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))
        })
        .await
        .map_err(|e| anyhow::anyhow!("password hashing task failed: {e}"))?
        .map_err(AuthServiceError::Internal)
    }

    /// Check `password` against a stored hash. A malformed hash never matches.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthServiceError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let matches = task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&hash) else {
                return false;
            };
            // Cost parameters come from the stored hash, not from `self`.
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .await
        .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))?;
        Ok(matches)
    }
}
