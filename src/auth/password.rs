//! Password hashing: bcrypt over a hex-encoded SHA-256 digest.
//!
//! bcrypt only reads the first 72 bytes of its input, so passwords are
//! pre-hashed to a fixed 64-character digest first. Hashing is CPU-bound and
//! runs on the blocking pool.

use anyhow::Context;
use sha2::{Digest, Sha256};

use crate::errors::AppError;

#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Compared against when the email is unknown, so both login failure
    /// paths do the same amount of work.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> anyhow::Result<Self> {
        let dummy_hash = bcrypt::hash(prehash("not-a-real-password"), cost)
            .context("invalid bcrypt cost")?;
        Ok(Self { cost, dummy_hash })
    }

    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(prehash(&password), cost))
            .await
            .context("password hashing task failed")?
            .context("bcrypt hash failed")?;
        Ok(hashed)
    }

    /// Check `password` against `stored`. With no stored hash the dummy hash
    /// is checked instead and the result is always `false`.
    pub async fn verify(&self, password: String, stored: Option<String>) -> Result<bool, AppError> {
        let known = stored.is_some();
        let hash = stored.unwrap_or_else(|| self.dummy_hash.clone());

        let matched = tokio::task::spawn_blocking(move || {
            bcrypt::verify(prehash(&password), &hash).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored password hash is malformed");
                false
            })
        })
        .await
        .context("password verify task failed")?;

        Ok(known && matched)
    }
}

fn prehash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
