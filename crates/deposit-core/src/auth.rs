//! # Auth Primitives
//!
//! Email/password account and bearer-session types, with the prototype's
//! salted SHA-256 digest. Not a hardened scheme (no stretching); account
//! storage and the login flow live in the API crate.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A registered user. Salt and digest stay server-side only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub salt: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with a fresh salt and hashed password
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: &str,
        phone: Option<String>,
    ) -> Self {
        let salt = generate_salt();
        let password_hash = hash_password(password, &salt);
        Self {
            id: Uuid::new_v4().simple().to_string()[..16].to_string(),
            name: name.into(),
            email: email.into().to_lowercase(),
            phone,
            salt,
            password_hash,
            created_at: Utc::now(),
        }
    }

    /// Check a login attempt against the stored digest
    pub fn verify_password(&self, password: &str) -> bool {
        hash_password(password, &self.salt) == self.password_hash
    }

    /// Re-salt and re-hash for a password reset
    pub fn set_password(&mut self, password: &str) {
        self.salt = generate_salt();
        self.password_hash = hash_password(password, &self.salt);
    }

    /// Copy of the user with credentials stripped, safe to serialize
    /// into API responses
    pub fn sanitized(&self) -> SafeUser {
        SafeUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            created_at: self.created_at,
        }
    }
}

/// User shape returned over the wire; never carries salt or digest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A bearer-token session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: generate_token(),
            created_at: Utc::now(),
        }
    }
}

/// 16 random bytes, hex-encoded
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 32 random bytes, hex-encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 over salt + password, hex-encoded
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Minimum password bar: at least 8 chars and one digit
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify_roundtrip() {
        let user = User::new("Aigerim", "Aigerim@Example.KZ", "s3curepass", None);
        assert_eq!(user.email, "aigerim@example.kz");
        assert!(user.verify_password("s3curepass"));
        assert!(!user.verify_password("wrongpass1"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let a = User::new("A", "a@x.kz", "s3curepass", None);
        let b = User::new("B", "b@x.kz", "s3curepass", None);
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn test_set_password_rotates_salt() {
        let mut user = User::new("A", "a@x.kz", "s3curepass", None);
        let old_salt = user.salt.clone();
        user.set_password("n3wpassword");
        assert_ne!(user.salt, old_salt);
        assert!(user.verify_password("n3wpassword"));
        assert!(!user.verify_password("s3curepass"));
    }

    #[test]
    fn test_sanitized_user_has_no_credentials() {
        let user = User::new("A", "a@x.kz", "s3curepass", Some("+7 700 000 00 00".into()));
        let json = serde_json::to_value(user.sanitized()).unwrap();
        assert!(json.get("salt").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "a@x.kz");
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("abcdefg1").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("nodigitshere").is_err());
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
