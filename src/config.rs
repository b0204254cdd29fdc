use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::auth::{AuthSettings, DefaultPayloadBuilder, RefreshWindow};
use crate::jwt::{self, JwtSettings, DEFAULT_ALGORITHM, DEFAULT_EXPIRATION_DELTA};

/// JWT Auth - issue and refresh JSON Web Tokens
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// HMAC signing key
    #[arg(short = 'k', long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Signing algorithm (HS256, HS384, HS512)
    #[arg(short = 'a', long, env = "JWT_ALGORITHM", default_value = DEFAULT_ALGORITHM)]
    pub algorithm: String,

    /// Verify token signatures when decoding
    #[arg(long, env = "JWT_VERIFY", default_value = "true", action = clap::ArgAction::Set)]
    pub verify: bool,

    /// Reject tokens whose exp claim has passed
    #[arg(long, env = "JWT_VERIFY_EXPIRATION", default_value = "true", action = clap::ArgAction::Set)]
    pub verify_expiration: bool,

    /// Seconds of leeway applied to the exp claim
    #[arg(long, env = "JWT_LEEWAY", default_value = "0")]
    pub leeway: u64,

    /// Lifetime of issued tokens in seconds
    #[arg(long, env = "JWT_EXPIRATION_DELTA", default_value_t = DEFAULT_EXPIRATION_DELTA)]
    pub expiration_delta: u64,

    /// Stamp orig_iat on issued tokens so they can be refreshed
    #[arg(long, env = "JWT_ALLOW_REFRESH", default_value = "false", action = clap::ArgAction::Set)]
    pub allow_refresh: bool,

    /// Maximum age of orig_iat for refresh (e.g. 3600, 90s, 7d, 1d3600s)
    #[arg(long, env = "JWT_REFRESH_EXPIRATION_DELTA", default_value = "7d")]
    pub refresh_window: RefreshWindow,

    /// Expected audience (aud claim)
    #[arg(long, env = "JWT_AUDIENCE")]
    pub audience: Option<String>,

    /// Expected issuer (iss claim)
    #[arg(long, env = "JWT_ISSUER")]
    pub issuer: Option<String>,

    /// Path to the JSON users file
    #[arg(short = 'u', long, env = "JWT_USERS_FILE")]
    pub users_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Authenticate with username and password and print a new token
    Issue {
        /// Identifier (value of the directory's username field)
        #[arg(long)]
        username: String,

        /// Password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Exchange a token for a new one within the refresh window
    Refresh {
        #[arg(long)]
        token: String,
    },

    /// Print an argon2 hash for the users file
    HashPassword {
        /// Password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Signing
    pub jwt: JwtSettings,
    pub expiration_delta: u64,

    // Refresh policy
    pub auth: AuthSettings,

    // Identity provider
    pub users_file: Option<PathBuf>,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;

        Ok((config, args.command))
    }

    /// Build configuration from parsed arguments (CLI > ENV > defaults)
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let algorithm = jwt::parse_algorithm(&args.algorithm)?;

        let mut jwt = JwtSettings::new(args.secret_key.clone().unwrap_or_default());
        jwt.algorithm = algorithm;
        jwt.verify = args.verify;
        jwt.verify_expiration = args.verify_expiration;
        jwt.leeway = args.leeway;
        jwt.audience = args.audience.clone();
        jwt.issuer = args.issuer.clone();

        Ok(Config {
            jwt,
            expiration_delta: args.expiration_delta,
            auth: AuthSettings::new(args.allow_refresh, args.refresh_window),
            users_file: args.users_file.as_deref().map(PathBuf::from),
            log_level: args.log_level.clone(),
        })
    }

    /// Validate configuration needed to sign and verify tokens
    pub fn validate(&self) -> Result<()> {
        if self.jwt.secret_key.is_empty() {
            anyhow::bail!("JWT_SECRET_KEY is required (use -k or set JWT_SECRET_KEY env var)");
        }

        self.expiration_delta()?;

        let users_file = self
            .users_file
            .as_ref()
            .context("JWT_USERS_FILE is required (use -u or set JWT_USERS_FILE env var)")?;
        if !users_file.exists() {
            anyhow::bail!("JWT_USERS_FILE does not exist: {}", users_file.display());
        }

        Ok(())
    }

    /// Token lifetime as a duration, rejecting values chrono cannot represent
    pub fn expiration_delta(&self) -> Result<Duration> {
        i64::try_from(self.expiration_delta)
            .ok()
            .and_then(Duration::try_seconds)
            .with_context(|| {
                format!(
                    "JWT_EXPIRATION_DELTA is out of range: {}",
                    self.expiration_delta
                )
            })
    }

    /// Payload builder matching the signing settings
    pub fn payload_builder(&self) -> Result<DefaultPayloadBuilder> {
        Ok(DefaultPayloadBuilder::new(self.expiration_delta()?)
            .with_audience(self.jwt.audience.clone())
            .with_issuer(self.jwt.issuer.clone()))
    }
}
