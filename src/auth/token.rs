use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const TOKEN_PREFIX: &str = "warden";
const SECRET_BYTES: usize = 20;
const SECRET_LENGTH: usize = SECRET_BYTES * 2;

/// Generates a new API token with the format `warden_<secret>`.
/// Returns (raw_token, digest); only the digest is stored.
#[must_use]
pub fn generate_token() -> (String, String) {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    let raw_token = format!("{TOKEN_PREFIX}_{}", hex::encode(bytes));
    let digest = token_digest(&raw_token);
    (raw_token, digest)
}

/// SHA-256 of the raw token, hex encoded.
#[must_use]
pub fn token_digest(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// Checks the token shape and returns its secret part.
pub fn parse_token(token: &str) -> Result<&str> {
    let secret = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.strip_prefix('_'))
        .ok_or(Error::InvalidTokenFormat)?;

    if secret.len() != SECRET_LENGTH || !secret.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidTokenFormat);
    }

    Ok(secret)
}
