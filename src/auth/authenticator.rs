// Credential authentication: username/password in, signed token out

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::claims::unix_seconds;
use super::settings::AuthSettings;
use super::strategy::{IdentityProvider, TokenHandlers};
use super::types::{Credentials, IssuedToken};
use super::{ensure_active, issue_token};
use crate::error::{AuthError, Result, INVALID_CREDENTIALS, MISSING_CREDENTIALS};

/// Issues tokens for verified credentials
pub struct CredentialAuthenticator {
    provider: Arc<dyn IdentityProvider>,
    handlers: TokenHandlers,
    settings: AuthSettings,

    /// Identifier field resolved from the provider at construction
    username_field: String,
}

impl CredentialAuthenticator {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        handlers: TokenHandlers,
        settings: AuthSettings,
    ) -> Self {
        let username_field = provider.username_field().to_string();
        Self {
            provider,
            handlers,
            settings,
            username_field,
        }
    }

    /// Field name callers must submit the identifier under
    pub fn username_field(&self) -> &str {
        &self.username_field
    }

    /// Verify credentials and issue a fresh token.
    ///
    /// Checks run in order and stop at the first failure: completeness,
    /// provider verification, account state. Unknown identifiers and wrong
    /// secrets fail with the same message.
    pub fn authenticate(&self, credentials: &Credentials, now: DateTime<Utc>) -> Result<IssuedToken> {
        if !credentials.is_complete() {
            tracing::debug!("Rejected incomplete credentials");
            return Err(AuthError::Validation(MISSING_CREDENTIALS.to_string()));
        }

        let user = self
            .provider
            .verify(credentials)
            .map_err(|e| AuthError::Internal(e.context("Identity provider verify failed")))?
            .ok_or_else(|| {
                tracing::debug!("Credential verification failed for {}", self.username_field);
                AuthError::Authentication(INVALID_CREDENTIALS.to_string())
            })?;

        ensure_active(&user)?;

        let orig_iat = self.settings.allow_refresh.then(|| unix_seconds(now));
        let issued = issue_token(&self.handlers, &user, orig_iat, now)?;

        tracing::info!("Issued token for user_id={}", user.id);
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        PayloadBuilder, TokenDecoder, TokenEncoder, TokenPayload, User, UserId, ORIG_IAT,
    };
    use crate::error::{TokenError, ACCOUNT_DISABLED};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plain JSON "codec" so tests can read claims back
    struct JsonCodec;

    impl TokenEncoder for JsonCodec {
        fn encode(&self, payload: &TokenPayload) -> std::result::Result<String, TokenError> {
            serde_json::to_string(payload).map_err(|e| TokenError::Encode(e.to_string()))
        }
    }

    impl TokenDecoder for JsonCodec {
        fn decode(
            &self,
            token: &str,
            _now: DateTime<Utc>,
        ) -> std::result::Result<TokenPayload, TokenError> {
            serde_json::from_str(token).map_err(|_| TokenError::Malformed)
        }
    }

    struct StubProvider {
        user: User,
        secret: &'static str,
        verify_calls: AtomicUsize,
    }

    impl IdentityProvider for StubProvider {
        fn verify(&self, credentials: &Credentials) -> anyhow::Result<Option<User>> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if credentials.identifier == self.user.username && credentials.secret == self.secret {
                Ok(Some(self.user.clone()))
            } else {
                Ok(None)
            }
        }

        fn lookup(&self, user_id: &UserId) -> anyhow::Result<Option<User>> {
            Ok((user_id == &self.user.id).then(|| self.user.clone()))
        }
    }

    fn stub(active: bool) -> Arc<StubProvider> {
        Arc::new(StubProvider {
            user: User {
                id: UserId::new("7"),
                username: "alice".to_string(),
                email: None,
                active,
            },
            secret: "wonderland",
            verify_calls: AtomicUsize::new(0),
        })
    }

    fn handlers() -> TokenHandlers {
        let payload: Arc<dyn PayloadBuilder> = Arc::new(|user: &User, _now: DateTime<Utc>| {
            let mut payload = TokenPayload::new();
            payload.insert("user_id", user.id.as_str());
            payload
        });
        TokenHandlers::with_codec(payload, Arc::new(JsonCodec))
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    fn decode(issued: &IssuedToken) -> TokenPayload {
        serde_json::from_str(issued.token()).unwrap()
    }

    #[test]
    fn test_issues_token_with_orig_iat() {
        let provider = stub(true);
        let auth = CredentialAuthenticator::new(
            provider,
            handlers(),
            AuthSettings::new(true, Default::default()),
        );

        let issued = auth
            .authenticate(&Credentials::new("alice", "wonderland"), at(1000))
            .unwrap();
        let payload = decode(&issued);
        assert_eq!(payload.get("user_id").and_then(|v| v.as_str()), Some("7"));
        assert_eq!(payload.orig_iat(), Some(1000));
    }

    #[test]
    fn test_omits_orig_iat_when_refresh_disabled() {
        let auth = CredentialAuthenticator::new(stub(true), handlers(), AuthSettings::default());

        let issued = auth
            .authenticate(&Credentials::new("alice", "wonderland"), at(1000))
            .unwrap();
        assert!(!decode(&issued).contains(ORIG_IAT));
    }

    #[test]
    fn test_missing_credentials_skip_provider() {
        let provider = stub(true);
        let auth = CredentialAuthenticator::new(provider.clone(), handlers(), AuthSettings::default());

        for creds in [
            Credentials::new("", "wonderland"),
            Credentials::new("alice", ""),
            Credentials::default(),
        ] {
            let err = auth.authenticate(&creds, at(1000)).unwrap_err();
            assert!(matches!(err, AuthError::Validation(ref msg) if msg == MISSING_CREDENTIALS));
        }
        assert_eq!(provider.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_wrong_secret_and_unknown_user_look_the_same() {
        let auth = CredentialAuthenticator::new(stub(true), handlers(), AuthSettings::default());

        let wrong_secret = auth
            .authenticate(&Credentials::new("alice", "nope"), at(1000))
            .unwrap_err();
        let unknown_user = auth
            .authenticate(&Credentials::new("mallory", "wonderland"), at(1000))
            .unwrap_err();

        assert_eq!(wrong_secret.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_secret, AuthError::Authentication(ref msg) if msg == INVALID_CREDENTIALS));
    }

    #[test]
    fn test_inactive_user_rejected() {
        let auth = CredentialAuthenticator::new(stub(false), handlers(), AuthSettings::default());

        let err = auth
            .authenticate(&Credentials::new("alice", "wonderland"), at(1000))
            .unwrap_err();
        assert!(matches!(err, AuthError::Authentication(ref msg) if msg == ACCOUNT_DISABLED));
    }

    #[test]
    fn test_username_field_resolved_from_provider() {
        let auth = CredentialAuthenticator::new(stub(true), handlers(), AuthSettings::default());
        assert_eq!(auth.username_field(), "username");
    }
}
