// Error handling module
// Defines authentication errors and their JSON rendering

use serde_json::{json, Value};
use thiserror::Error;

/// Either the identifier or the secret was empty
pub const MISSING_CREDENTIALS: &str = "missing credentials";

/// Refresh was called without a token
pub const MISSING_TOKEN: &str = "missing token";

/// Shared message for unknown users and wrong secrets
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

/// The account exists but is not active
pub const ACCOUNT_DISABLED: &str = "account disabled";

/// The decoded payload carries no user identifier
pub const MISSING_USER_REFERENCE: &str = "missing user reference";

/// The decoded payload carries no original issue time
pub const ORIG_IAT_MISSING: &str = "orig_iat missing";

/// `orig_iat + refresh_window` lies in the past
pub const REFRESH_WINDOW_EXPIRED: &str = "refresh window expired";

/// Errors returned by token issuance and refresh
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or malformed input, the caller's fault
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credential or account-state rejection
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Decode failure, missing required claim, or expired refresh window
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    /// Identity provider or token encoder failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable error kind
    pub fn error_type(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation_error",
            AuthError::Authentication(_) => "auth_error",
            AuthError::TokenInvalid(_) => "token_invalid",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(msg)
            | AuthError::Authentication(msg)
            | AuthError::TokenInvalid(msg) => msg.clone(),
            AuthError::Internal(err) => {
                // Log internal errors
                tracing::error!("Internal error: {:?}", err);
                "Internal error".to_string()
            }
        }
    }

    /// Render as `{"error": {"message", "type"}}`
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "message": self.public_message(),
                "type": self.error_type(),
            }
        })
    }
}

/// Failures of the token encode/decode primitive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("signature has expired")]
    Expired,

    #[error("error decoding signature")]
    InvalidSignature,

    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    #[error("error decoding token")]
    Malformed,

    #[error("error encoding token: {0}")]
    Encode(String),
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;
