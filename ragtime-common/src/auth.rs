//! Credential and session token primitives
//!
//! Pure functions only; no HTTP framework dependencies. Cookie plumbing and
//! extractors live in the web crate.

use crate::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated session tokens
const TOKEN_LEN: usize = 48;

/// Hash a password for storage (bcrypt, default cost)
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored bcrypt hash
///
/// A malformed stored hash counts as a failed verification rather than an
/// error; login must not leak which part failed.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or(false)
}

/// Generate a random alphanumeric session token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest of a token; only this is stored in the database
pub fn token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

        // Two tokens should differ
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_token_hash_is_hex_sha256() {
        let digest = token_hash("abc123");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));

        // Deterministic
        assert_eq!(digest, token_hash("abc123"));
        assert_ne!(digest, token_hash("abc124"));
    }
}
