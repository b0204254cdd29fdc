// Authentication types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier field used when the identity provider declares none
pub const DEFAULT_USERNAME_FIELD: &str = "username";

/// Form field carrying the secret
pub const PASSWORD_FIELD: &str = "password";

/// Stable user identifier owned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User record as seen by this crate (read-only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub active: bool,
}

/// Identifier/secret pair submitted for authentication
#[derive(Clone, Default)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Read credentials from a flat form, using the provider's identifier field.
    ///
    /// Absent fields become empty strings so that completeness is judged in one
    /// place by the authenticator.
    pub fn from_form(form: &HashMap<String, String>, username_field: &str) -> Self {
        Self {
            identifier: form.get(username_field).cloned().unwrap_or_default(),
            secret: form.get(PASSWORD_FIELD).cloned().unwrap_or_default(),
        }
    }

    /// Both fields present and non-empty
    pub fn is_complete(&self) -> bool {
        !self.identifier.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Token handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    token: String,
}

impl IssuedToken {
    pub(crate) fn new(token: String) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn into_token(self) -> String {
        self.token
    }
}
