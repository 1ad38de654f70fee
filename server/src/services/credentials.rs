//! Password hashing and signed session tokens.
//!
//! Hashes are PBKDF2-HMAC-SHA256 encoded as
//! `pbkdf2-sha256$<iterations>$<salt>$<hash>` (base64, no padding). Tokens are
//! compact HS256 JWTs carrying the account id and kind.

use std::num::NonZeroU32;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, hmac, pbkdf2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::AccountKind;

pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;
/// Tokens are valid for 24 hours from issue.
pub const TOKEN_TTL_HOURS: i64 = 24;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;
const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password hash iterations must be greater than zero")]
    ZeroIterations,

    #[error("system random source failed")]
    Random,

    #[error("failed to encode token claims: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub kind: AccountKind,
    pub iat: i64,
    pub exp: i64,
}

/// Hashes passwords and signs/verifies tokens with one shared secret.
#[derive(Clone)]
pub struct Credentials {
    rng: SystemRandom,
    iterations: NonZeroU32,
    signing_key: hmac::Key,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(secret: &[u8], iterations: u32) -> Result<Self, CredentialError> {
        let iterations = NonZeroU32::new(iterations).ok_or(CredentialError::ZeroIterations)?;
        Ok(Self {
            rng: SystemRandom::new(),
            iterations,
            signing_key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        })
    }

    pub fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|_| CredentialError::Random)?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );

        Ok(format!(
            "{HASH_SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(hash)
        ))
    }

    /// Constant-time check of `password` against a stored hash. Unparseable
    /// hashes never match.
    pub fn verify_password(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        if scheme != HASH_SCHEME {
            return false;
        }
        let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
            return false;
        };
        let (Ok(salt), Ok(hash)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(hash))
        else {
            return false;
        };

        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            &salt,
            password.as_bytes(),
            &hash,
        )
        .is_ok()
    }

    /// [`Credentials::hash_password`] on the blocking pool.
    pub async fn hash_password_blocking(&self, password: &str) -> Result<String, CredentialError> {
        let credentials = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || credentials.hash_password(&password)).await?
    }

    /// [`Credentials::verify_password`] on the blocking pool.
    pub async fn verify_password_blocking(
        &self,
        password: &str,
        stored: &str,
    ) -> Result<bool, CredentialError> {
        let credentials = self.clone();
        let (password, stored) = (password.to_string(), stored.to_string());
        let matched =
            tokio::task::spawn_blocking(move || credentials.verify_password(&password, &stored))
                .await?;
        Ok(matched)
    }

    pub fn issue_token(
        &self,
        account_id: Uuid,
        kind: AccountKind,
        now: DateTime<Utc>,
    ) -> Result<String, CredentialError> {
        let claims = Claims {
            sub: account_id,
            kind,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        let header = URL_SAFE_NO_PAD.encode(JWT_HEADER);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{header}.{payload}");
        let signature = hmac::sign(&self.signing_key, signing_input.as_bytes());

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.as_ref())
        ))
    }

    pub fn verify_token(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, payload) = signing_input
            .split_once('.')
            .ok_or(TokenError::Malformed)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        hmac::verify(&self.signing_key, signing_input.as_bytes(), &signature)
            .map_err(|_| TokenError::BadSignature)?;

        let header = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| TokenError::Malformed)?;
        if header != JWT_HEADER.as_bytes() {
            return Err(TokenError::Malformed);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
