//! Stateless renewal tokens.
//!
//! A token is the base64 form of an Argon2id PHC string computed over the
//! resource's `renewed_at` and the shared secret. Nothing is stored: once
//! `renewed_at` moves, every token issued before it stops verifying.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

const MEMORY_COST_KIB: u32 = 4096;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode token input: {0}")]
    Encode(String),

    #[error("Failed to hash token: {0}")]
    Hash(String),

    #[error("Malformed token")]
    Malformed,

    #[error("Token does not match")]
    Mismatch,

    #[error("Token task failed: {0}")]
    Task(String),
}

#[derive(Serialize)]
struct TokenInput<'a> {
    renewed_at: &'a str,
    secret: &'a str,
}

fn canonical_input(renewed_at: &str, secret: &str) -> Result<Vec<u8>, TokenError> {
    serde_json::to_vec(&TokenInput { renewed_at, secret })
        .map_err(|err| TokenError::Encode(err.to_string()))
}

fn hasher() -> Result<Argon2<'static>, TokenError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|err| TokenError::Hash(err.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Token for a renewal link of a resource last renewed at `renewed_at`.
pub fn generate_token(renewed_at: &str, secret: &str) -> Result<String, TokenError> {
    let input = canonical_input(renewed_at, secret)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(&input, &salt)
        .map_err(|err| TokenError::Hash(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(hash.to_string()))
}

/// Check `candidate` against the resource's current `renewed_at`.
///
/// Anything that isn't an Argon2id hash with exactly our cost parameters is
/// rejected before hashing, so a crafted token can't pick its own cost.
pub fn validate_token(candidate: &str, renewed_at: &str, secret: &str) -> Result<(), TokenError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(candidate.trim())
        .map_err(|_| TokenError::Malformed)?;
    let phc = std::str::from_utf8(&decoded).map_err(|_| TokenError::Malformed)?;
    let hash = PasswordHash::new(phc).map_err(|_| TokenError::Malformed)?;

    if hash.algorithm != Algorithm::Argon2id.ident() {
        return Err(TokenError::Malformed);
    }
    let params = Params::try_from(&hash).map_err(|_| TokenError::Malformed)?;
    if params.m_cost() != MEMORY_COST_KIB
        || params.t_cost() != TIME_COST
        || params.p_cost() != PARALLELISM
    {
        return Err(TokenError::Malformed);
    }

    let input = canonical_input(renewed_at, secret)?;
    hasher()?
        .verify_password(&input, &hash)
        .map_err(|_| TokenError::Mismatch)
}

/// [`generate_token`] on the blocking pool, off the async workers.
pub async fn issue_token(renewed_at: &str, secret: &str) -> Result<String, TokenError> {
    let renewed_at = renewed_at.to_string();
    let secret = secret.to_string();
    tokio::task::spawn_blocking(move || generate_token(&renewed_at, &secret))
        .await
        .map_err(|err| TokenError::Task(err.to_string()))?
}

/// [`validate_token`] on the blocking pool, off the async workers.
pub async fn check_token(candidate: &str, renewed_at: &str, secret: &str) -> Result<(), TokenError> {
    let candidate = candidate.to_string();
    let renewed_at = renewed_at.to_string();
    let secret = secret.to_string();
    tokio::task::spawn_blocking(move || validate_token(&candidate, &renewed_at, &secret))
        .await
        .map_err(|err| TokenError::Task(err.to_string()))?
}
