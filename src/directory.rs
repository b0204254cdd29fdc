// In-memory user directory
// Loads users from a JSON file and verifies argon2 password hashes

use anyhow::{Context, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::auth::{Credentials, IdentityProvider, User, UserId, DEFAULT_USERNAME_FIELD};

fn default_active() -> bool {
    true
}

fn default_username_field() -> String {
    DEFAULT_USERNAME_FIELD.to_string()
}

/// A user entry as stored in the users file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// argon2 PHC string
    pub password_hash: String,

    #[serde(default = "default_active")]
    pub active: bool,
}

impl UserRecord {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: None,
            password_hash: password_hash.into(),
            active: true,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    fn to_user(&self) -> User {
        User {
            id: UserId::new(self.id.as_str()),
            username: self.username.clone(),
            email: self.email.clone(),
            active: self.active,
        }
    }
}

/// Users file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default = "default_username_field")]
    username_field: String,
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// Identity provider backed by an in-memory user list
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    username_field: String,
    users: Vec<UserRecord>,
}

impl MemoryDirectory {
    pub fn new(username_field: impl Into<String>) -> Self {
        Self {
            username_field: username_field.into(),
            users: Vec::new(),
        }
    }

    pub fn with_user(mut self, record: UserRecord) -> Self {
        self.users.push(record);
        self
    }

    /// Parse a users document
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DirectoryFile =
            serde_json::from_str(json).context("Failed to parse users file")?;

        match file.username_field.as_str() {
            "id" | "username" | "email" => {}
            other => anyhow::bail!("Unsupported username_field: {}", other),
        }

        Ok(Self {
            username_field: file.username_field,
            users: file.users,
        })
    }

    /// Load users from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read users file: {}", path.display()))?;
        let directory = Self::from_json(&contents)?;
        tracing::info!(
            "Loaded {} users from {} (username field: {})",
            directory.users.len(),
            path.display(),
            directory.username_field
        );
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn find_by_identifier(&self, identifier: &str) -> Option<&UserRecord> {
        self.users.iter().find(|record| {
            let value = match self.username_field.as_str() {
                "id" => Some(record.id.as_str()),
                "email" => record.email.as_deref(),
                _ => Some(record.username.as_str()),
            };
            value == Some(identifier)
        })
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME_FIELD)
    }
}

impl IdentityProvider for MemoryDirectory {
    fn username_field(&self) -> &str {
        &self.username_field
    }

    fn verify(&self, credentials: &Credentials) -> Result<Option<User>> {
        let Some(record) = self.find_by_identifier(&credentials.identifier) else {
            return Ok(None);
        };

        if verify_password(&credentials.secret, &record.password_hash)? {
            Ok(Some(record.to_user()))
        } else {
            Ok(None)
        }
    }

    fn lookup(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|record| record.id == user_id.as_str())
            .map(UserRecord::to_user))
    }
}

/// Hash a password into an argon2 PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow::anyhow!("Failed to encode salt: {}", e))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    Ok(hash.to_string())
}

/// Check a password against a stored PHC string.
///
/// A malformed stored hash is a directory error, not a failed login.
fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Invalid stored password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
