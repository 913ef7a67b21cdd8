//! Anti-forgery tokens and credential hashing
//!
//! Pure functions only; the HTTP layer wraps them in its own extractors.
//!
//! - Every session gets one random token at creation, valid for the
//!   session's lifetime.
//! - Every action touching per-user state must echo that token.
//! - Passwords are stored as SHA-256 over `salt + password`, hex encoded.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

// ========================================
// Error Types
// ========================================

/// Session validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAuthError {
    /// No session id supplied, or the id is unknown
    UnknownSession,

    /// Request did not carry a token
    MissingToken,

    /// Token does not match the session's token
    InvalidToken,

    /// Session is older than the configured timeout
    Expired { age_seconds: i64 },
}

impl std::fmt::Display for SessionAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionAuthError::UnknownSession => write!(f, "Unknown session"),
            SessionAuthError::MissingToken => write!(f, "Missing security token"),
            SessionAuthError::InvalidToken => write!(f, "Invalid security token"),
            SessionAuthError::Expired { age_seconds } => {
                write!(f, "Session expired ({}s old)", age_seconds)
            }
        }
    }
}

impl std::error::Error for SessionAuthError {}

// ========================================
// Token Generation and Validation
// ========================================

/// 64 hex chars derived from 32 random bytes
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{:x}", Sha256::digest(bytes))
}

/// Random per-user password salt
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Compare a provided token against the session's token
///
/// Comparison time does not depend on where the strings first differ.
pub fn validate_token(provided: Option<&str>, expected: &str) -> Result<(), SessionAuthError> {
    let provided = provided.ok_or(SessionAuthError::MissingToken)?;

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(SessionAuthError::InvalidToken)
    }
}

/// Reject sessions older than `timeout_seconds`
pub fn validate_session_age(
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    timeout_seconds: i64,
) -> Result<(), SessionAuthError> {
    let age = now - created_at;
    if age > Duration::seconds(timeout_seconds) {
        return Err(SessionAuthError::Expired {
            age_seconds: age.num_seconds(),
        });
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ========================================
// Password Hashing
// ========================================

/// SHA-256 over `salt + password`, 64 hex chars
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a password against a stored salt/hash pair
pub fn verify_password(salt: &str, password: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_password(salt, password).as_bytes(), stored_hash.as_bytes())
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_validation() {
        let token = generate_token();
        assert!(validate_token(Some(&token), &token).is_ok());
        assert_eq!(
            validate_token(None, &token),
            Err(SessionAuthError::MissingToken)
        );
        assert_eq!(
            validate_token(Some("abc"), &token),
            Err(SessionAuthError::InvalidToken)
        );
        assert_eq!(
            validate_token(Some(""), &token),
            Err(SessionAuthError::InvalidToken)
        );
    }

    #[test]
    fn test_session_age_boundary() {
        let created = Utc::now();
        assert!(validate_session_age(created, created + Duration::seconds(60), 60).is_ok());
        assert!(matches!(
            validate_session_age(created, created + Duration::seconds(61), 60),
            Err(SessionAuthError::Expired { age_seconds: 61 })
        ));
    }

    #[test]
    fn test_password_hash_round_trip() {
        let salt = generate_salt();
        let hash = hash_password(&salt, "hunter2");
        assert_eq!(hash.len(), 64);
        assert!(verify_password(&salt, "hunter2", &hash));
        assert!(!verify_password(&salt, "hunter3", &hash));
        assert!(!verify_password("other-salt", "hunter2", &hash));
    }
}
