//! Credential hashing and the authenticated-caller context.

use std::num::NonZeroU32;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use thiserror::Error;

const SCHEME: &str = "pbkdf2-sha256";
static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Secure random source unavailable")]
    Rng,
    #[error("Hashing task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Salted PBKDF2-HMAC-SHA256 hashing.
///
/// Encoded form: `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded
/// base64 salt and hash. The iteration count travels with the hash, so changing
/// the configured count only affects newly hashed passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    pub fn new(iterations: NonZeroU32) -> Self {
        Self {
            iterations,
            rng: SystemRandom::new(),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| HashError::Rng)?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(ALGORITHM, self.iterations, &salt, password.as_bytes(), &mut hash);

        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(hash)
        ))
    }

    /// Constant-time check of `password` against an encoded hash. A malformed
    /// hash never matches.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Some((iterations, salt, hash)) = decode(encoded) else {
            tracing::warn!("Stored password hash is malformed");
            return false;
        };
        pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok()
    }

    /// Spend the same work as a real verification, for handles that don't exist.
    pub fn verify_nothing(&self, password: &str) {
        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            ALGORITHM,
            self.iterations,
            &[0u8; SALT_LEN],
            password.as_bytes(),
            &mut hash,
        );
    }

    /// `hash` on the blocking pool, keeping the async runtime free.
    pub async fn hash_off_thread(&self, password: &str) -> Result<String, HashError> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    /// `verify` on the blocking pool. Without a stored hash the same work is
    /// spent through `verify_nothing` and the result is `false`.
    pub async fn verify_off_thread(
        &self,
        password: &str,
        encoded: Option<String>,
    ) -> Result<bool, HashError> {
        let hasher = self.clone();
        let password = password.to_string();
        let matched = tokio::task::spawn_blocking(move || match encoded {
            Some(encoded) => hasher.verify(&password, &encoded),
            None => {
                hasher.verify_nothing(&password);
                false
            }
        })
        .await?;
        Ok(matched)
    }
}

fn decode(encoded: &str) -> Option<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: NonZeroU32 = parts.next()?.parse().ok()?;
    let salt = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    let hash = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    if parts.next().is_some() || hash.len() != HASH_LEN {
        return None;
    }
    Some((iterations, salt, hash))
}

/// Proof that the caller presented valid administrator credentials.
///
/// Only obtainable through `Catalog::authenticate`; every mutating catalog
/// operation takes one.
#[derive(Debug, Clone)]
pub struct AuthContext {
    author_id: u64,
    email: String,
}

impl AuthContext {
    pub(crate) fn new(author_id: u64, email: impl Into<String>) -> Self {
        Self {
            author_id,
            email: email.into(),
        }
    }

    pub fn author_id(&self) -> u64 {
        self.author_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
