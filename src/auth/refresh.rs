// Token refresh logic

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::claims::unix_seconds;
use super::settings::AuthSettings;
use super::strategy::{IdentityProvider, TokenHandlers};
use super::types::IssuedToken;
use super::{ensure_active, issue_token};
use crate::error::{
    AuthError, Result, INVALID_CREDENTIALS, MISSING_TOKEN, MISSING_USER_REFERENCE,
    ORIG_IAT_MISSING, REFRESH_WINDOW_EXPIRED,
};

/// Re-issues tokens that are still inside their refresh window
pub struct TokenRefresher {
    provider: Arc<dyn IdentityProvider>,
    handlers: TokenHandlers,
    settings: AuthSettings,
}

impl TokenRefresher {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        handlers: TokenHandlers,
        settings: AuthSettings,
    ) -> Self {
        Self {
            provider,
            handlers,
            settings,
        }
    }

    /// Exchange a previously issued token for a new one.
    ///
    /// The new payload is rebuilt from the current user record. When refresh
    /// is allowed, `orig_iat` is copied from the old token unchanged, so the
    /// window is measured from the first issuance of the chain.
    pub fn refresh(&self, token: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
        if token.is_empty() {
            return Err(AuthError::Validation(MISSING_TOKEN.to_string()));
        }

        let old_payload = self.handlers.decoder.decode(token, now).map_err(|e| {
            tracing::debug!("Token decode failed: {}", e);
            AuthError::TokenInvalid(e.to_string())
        })?;

        let user_id = self
            .handlers
            .user_id
            .extract(&old_payload)
            .ok_or_else(|| AuthError::TokenInvalid(MISSING_USER_REFERENCE.to_string()))?;

        let user = self
            .provider
            .lookup(&user_id)
            .map_err(|e| AuthError::Internal(e.context("Identity provider lookup failed")))?
            .ok_or_else(|| {
                tracing::debug!("Refresh for unknown user_id={}", user_id);
                AuthError::Authentication(INVALID_CREDENTIALS.to_string())
            })?;

        ensure_active(&user)?;

        let orig_iat = old_payload
            .orig_iat()
            .ok_or_else(|| AuthError::Validation(ORIG_IAT_MISSING.to_string()))?;

        let expiration = orig_iat.saturating_add(self.settings.refresh_window_seconds());
        if unix_seconds(now) > expiration {
            tracing::debug!(
                "Refresh window expired for user_id={}: orig_iat={}, expiration={}",
                user.id,
                orig_iat,
                expiration
            );
            return Err(AuthError::TokenInvalid(REFRESH_WINDOW_EXPIRED.to_string()));
        }

        let carried = self.settings.allow_refresh.then_some(orig_iat);
        let issued = issue_token(&self.handlers, &user, carried, now)?;

        tracing::info!("Refreshed token for user_id={}", user.id);
        Ok(issued)
    }
}
