use anyhow::{Context, Result};
use chrono::Utc;
use dialoguer::Password;
use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use jwt_auth::auth::{
    CredentialAuthenticator, Credentials, IssuedToken, TokenHandlers, TokenRefresher,
    PASSWORD_FIELD,
};
use jwt_auth::config::{Command, Config};
use jwt_auth::directory::{self, MemoryDirectory};
use jwt_auth::jwt::JwtCodec;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    let now = Utc::now();
    let result = match command {
        Command::HashPassword { password } => {
            let password = read_password(password, "Password to hash")?;
            println!("{}", directory::hash_password(&password)?);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Issue { username, password } => {
            let (provider, handlers) = build_handlers(&config)?;
            let authenticator = CredentialAuthenticator::new(provider, handlers, config.auth);
            let password = read_password(password, "Password")?;

            // Submit the identifier under the directory's own field name
            let mut form = HashMap::new();
            form.insert(authenticator.username_field().to_string(), username);
            form.insert(PASSWORD_FIELD.to_string(), password);
            let credentials = Credentials::from_form(&form, authenticator.username_field());

            authenticator.authenticate(&credentials, now)
        }
        Command::Refresh { token } => {
            let (provider, handlers) = build_handlers(&config)?;
            TokenRefresher::new(provider, handlers, config.auth).refresh(&token, now)
        }
    };

    print_result(result)
}

/// Load the user directory and the JWT strategies
fn build_handlers(config: &Config) -> Result<(Arc<MemoryDirectory>, TokenHandlers)> {
    config.validate()?;
    tracing::debug!("Configuration: {:?}", config);

    let users_file = config
        .users_file
        .as_deref()
        .context("JWT_USERS_FILE is required")?;
    let provider = Arc::new(MemoryDirectory::load(users_file)?);
    let codec = Arc::new(JwtCodec::new(config.jwt.clone())?);
    let handlers = TokenHandlers::with_codec(Arc::new(config.payload_builder()?), codec);

    Ok((provider, handlers))
}

/// Use the given password or prompt for one
fn read_password(password: Option<String>, prompt: &str) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => Password::new()
            .with_prompt(prompt)
            .interact()
            .context("Failed to read password"),
    }
}

/// Print `{"token": ...}` on success, the error body on failure
fn print_result(result: jwt_auth::error::Result<IssuedToken>) -> Result<ExitCode> {
    match result {
        Ok(issued) => {
            let body = serde_json::to_string(&issued).context("Failed to serialize token")?;
            println!("{}", body);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{}", e.to_json());
            Ok(ExitCode::FAILURE)
        }
    }
}
