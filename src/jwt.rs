// JSON Web Token codec
// HMAC-signed encode/decode for token payloads

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::auth::{unix_seconds, TokenDecoder, TokenEncoder, TokenPayload};
use crate::error::TokenError;

/// Default signing algorithm
pub const DEFAULT_ALGORITHM: &str = "HS256";

/// Default token lifetime in seconds
pub const DEFAULT_EXPIRATION_DELTA: u64 = 300;

/// Signing and verification settings
#[derive(Clone)]
pub struct JwtSettings {
    pub secret_key: String,
    pub algorithm: Algorithm,

    /// Check the signature when decoding
    pub verify: bool,

    /// Reject tokens whose `exp` lies in the past
    pub verify_expiration: bool,

    /// Seconds of tolerance applied to `exp`
    pub leeway: u64,

    pub audience: Option<String>,
    pub issuer: Option<String>,
}

impl JwtSettings {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            algorithm: Algorithm::HS256,
            verify: true,
            verify_expiration: true,
            leeway: 0,
            audience: None,
            issuer: None,
        }
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("verify", &self.verify)
            .field("verify_expiration", &self.verify_expiration)
            .field("leeway", &self.leeway)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Parse an HMAC algorithm name (`HS256`, `HS384`, `HS512`)
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::from_str(&name.to_uppercase())
        .with_context(|| format!("Unknown JWT algorithm: {}", name))?;

    if !is_hmac(algorithm) {
        anyhow::bail!("Unsupported JWT algorithm {}: only HMAC algorithms are supported", name);
    }
    Ok(algorithm)
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// HMAC JWT encoder/decoder
pub struct JwtCodec {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    pub fn new(settings: JwtSettings) -> Result<Self> {
        if settings.secret_key.is_empty() {
            anyhow::bail!("JWT secret key cannot be empty");
        }
        if !is_hmac(settings.algorithm) {
            anyhow::bail!("Unsupported JWT algorithm {:?}: only HMAC algorithms are supported", settings.algorithm);
        }

        let encoding_key = EncodingKey::from_secret(settings.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.secret_key.as_bytes());

        // Expiration is checked against the injected clock, not the system one
        let mut validation = Validation::new(settings.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = settings.leeway;

        match settings.audience {
            Some(ref audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }
        if let Some(ref issuer) = settings.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        if !settings.verify {
            validation.insecure_disable_signature_validation();
        }

        Ok(Self {
            settings,
            encoding_key,
            decoding_key,
            validation,
        })
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    fn check_expiration(&self, payload: &TokenPayload, now: DateTime<Utc>) -> Result<(), TokenError> {
        if !self.settings.verify_expiration {
            return Ok(());
        }

        let exp = match payload.get("exp") {
            None => return Ok(()),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| TokenError::InvalidClaim("exp".to_string()))?,
        };

        let leeway = i64::try_from(self.settings.leeway).unwrap_or(i64::MAX);
        if unix_seconds(now) > exp.saturating_add(leeway) {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}

impl TokenEncoder for JwtCodec {
    fn encode(&self, payload: &TokenPayload) -> std::result::Result<String, TokenError> {
        let header = Header::new(self.settings.algorithm);
        jsonwebtoken::encode(&header, payload.claims(), &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }
}

impl TokenDecoder for JwtCodec {
    fn decode(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<TokenPayload, TokenError> {
        let data = jsonwebtoken::decode::<Map<String, Value>>(
            token,
            &self.decoding_key,
            &self.validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAudience => TokenError::InvalidClaim("aud".to_string()),
            ErrorKind::InvalidIssuer => TokenError::InvalidClaim("iss".to_string()),
            _ => TokenError::Malformed,
        })?;

        let payload = TokenPayload::from(data.claims);
        self.check_expiration(&payload, now)?;
        Ok(payload)
    }
}
