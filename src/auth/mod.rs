// Authentication module
// Credential-based token issuance and refresh

mod authenticator;
mod claims;
mod refresh;
mod settings;
mod strategy;
mod types;

pub use authenticator::CredentialAuthenticator;
pub use claims::{unix_seconds, TokenPayload, ORIG_IAT};
pub use refresh::TokenRefresher;
pub use settings::{AuthSettings, RefreshWindow, DEFAULT_REFRESH_WINDOW_DAYS};
pub use strategy::{
    ClaimUserIdExtractor, DefaultPayloadBuilder, IdentityProvider, PayloadBuilder,
    TokenDecoder, TokenEncoder, TokenHandlers, UserIdExtractor, USER_ID_CLAIM,
};
pub use types::{
    Credentials, IssuedToken, User, UserId, DEFAULT_USERNAME_FIELD, PASSWORD_FIELD,
};

use chrono::{DateTime, Utc};

use crate::error::{AuthError, Result, ACCOUNT_DISABLED};

/// Reject inactive accounts
fn ensure_active(user: &User) -> Result<()> {
    if !user.active {
        tracing::warn!("Rejected disabled account: user_id={}", user.id);
        return Err(AuthError::Authentication(ACCOUNT_DISABLED.to_string()));
    }
    Ok(())
}

/// Build, stamp and encode a token for `user`
fn issue_token(
    handlers: &TokenHandlers,
    user: &User,
    orig_iat: Option<i64>,
    now: DateTime<Utc>,
) -> Result<IssuedToken> {
    let mut payload = handlers.payload.build(user, now);

    match orig_iat {
        Some(orig_iat) => payload.set_orig_iat(orig_iat),
        None => {
            payload.remove(ORIG_IAT);
        }
    }

    let token = handlers
        .encoder
        .encode(&payload)
        .map_err(|e| AuthError::Internal(anyhow::Error::new(e).context("Failed to encode token")))?;

    Ok(IssuedToken::new(token))
}
