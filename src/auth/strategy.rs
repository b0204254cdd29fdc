// Pluggable collaborators for issuance and refresh

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;

use super::claims::{unix_seconds, TokenPayload};
use super::types::{Credentials, User, UserId, DEFAULT_USERNAME_FIELD};
use crate::error::TokenError;

/// Claim carrying the user identifier in default payloads
pub const USER_ID_CLAIM: &str = "user_id";

/// External service owning user records and credential checks
pub trait IdentityProvider: Send + Sync {
    /// Name of the field users log in with
    fn username_field(&self) -> &str {
        DEFAULT_USERNAME_FIELD
    }

    /// `Ok(None)` when the identifier is unknown or the secret is wrong
    fn verify(&self, credentials: &Credentials) -> Result<Option<User>>;

    fn lookup(&self, user_id: &UserId) -> Result<Option<User>>;
}

/// Builds the claims of a fresh token from live user state
pub trait PayloadBuilder: Send + Sync {
    fn build(&self, user: &User, now: DateTime<Utc>) -> TokenPayload;
}

impl<F> PayloadBuilder for F
where
    F: Fn(&User, DateTime<Utc>) -> TokenPayload + Send + Sync,
{
    fn build(&self, user: &User, now: DateTime<Utc>) -> TokenPayload {
        self(user, now)
    }
}

/// Signs a payload into a token string
pub trait TokenEncoder: Send + Sync {
    fn encode(&self, payload: &TokenPayload) -> std::result::Result<String, TokenError>;
}

/// Parses and verifies a token string, rejecting expired tokens as of `now`
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, token: &str, now: DateTime<Utc>)
        -> std::result::Result<TokenPayload, TokenError>;
}

/// Recovers the user identifier from decoded claims
pub trait UserIdExtractor: Send + Sync {
    fn extract(&self, payload: &TokenPayload) -> Option<UserId>;
}

impl<F> UserIdExtractor for F
where
    F: Fn(&TokenPayload) -> Option<UserId> + Send + Sync,
{
    fn extract(&self, payload: &TokenPayload) -> Option<UserId> {
        self(payload)
    }
}

/// Default claims: `user_id`, `username`, `email`, `exp`, plus optional `aud`/`iss`
#[derive(Debug, Clone)]
pub struct DefaultPayloadBuilder {
    expiration_delta: Duration,
    audience: Option<String>,
    issuer: Option<String>,
}

impl DefaultPayloadBuilder {
    pub fn new(expiration_delta: Duration) -> Self {
        Self {
            expiration_delta,
            audience: None,
            issuer: None,
        }
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// `now + expiration_delta`, saturating at the representable date range
    fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.expiration_delta)
            .unwrap_or(if self.expiration_delta < Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}

impl PayloadBuilder for DefaultPayloadBuilder {
    fn build(&self, user: &User, now: DateTime<Utc>) -> TokenPayload {
        let mut payload = TokenPayload::new();
        payload.insert(USER_ID_CLAIM, user.id.as_str());
        payload.insert("username", user.username.as_str());
        if let Some(ref email) = user.email {
            payload.insert("email", email.as_str());
        }
        payload.insert("exp", unix_seconds(self.expires_at(now)));
        if let Some(ref audience) = self.audience {
            payload.insert("aud", audience.as_str());
        }
        if let Some(ref issuer) = self.issuer {
            payload.insert("iss", issuer.as_str());
        }
        payload
    }
}

/// Reads the user id from a single claim, string or integer
#[derive(Debug, Clone)]
pub struct ClaimUserIdExtractor {
    claim: String,
}

impl ClaimUserIdExtractor {
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
        }
    }
}

impl Default for ClaimUserIdExtractor {
    fn default() -> Self {
        Self::new(USER_ID_CLAIM)
    }
}

impl UserIdExtractor for ClaimUserIdExtractor {
    fn extract(&self, payload: &TokenPayload) -> Option<UserId> {
        match payload.get(&self.claim)? {
            Value::String(id) if !id.is_empty() => Some(UserId::new(id.as_str())),
            Value::Number(id) => Some(UserId::new(id.to_string())),
            _ => None,
        }
    }
}

/// Token strategies injected into the authenticator and refresher
#[derive(Clone)]
pub struct TokenHandlers {
    pub payload: Arc<dyn PayloadBuilder>,
    pub encoder: Arc<dyn TokenEncoder>,
    pub decoder: Arc<dyn TokenDecoder>,
    pub user_id: Arc<dyn UserIdExtractor>,
}

impl TokenHandlers {
    pub fn new(
        payload: Arc<dyn PayloadBuilder>,
        encoder: Arc<dyn TokenEncoder>,
        decoder: Arc<dyn TokenDecoder>,
        user_id: Arc<dyn UserIdExtractor>,
    ) -> Self {
        Self {
            payload,
            encoder,
            decoder,
            user_id,
        }
    }

    /// One codec for both directions, default user-id extraction
    pub fn with_codec<C>(payload: Arc<dyn PayloadBuilder>, codec: Arc<C>) -> Self
    where
        C: TokenEncoder + TokenDecoder + 'static,
    {
        Self {
            payload,
            encoder: codec.clone(),
            decoder: codec,
            user_id: Arc::new(ClaimUserIdExtractor::default()),
        }
    }
}
