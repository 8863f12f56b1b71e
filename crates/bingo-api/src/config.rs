//! Runtime configuration read from the environment.

use std::fmt;
use std::net::SocketAddr;

use bingo_generation::application::command_handlers::ExecutionMode;

use crate::error::AppError;

/// Server configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Shared key expected in `X-API-KEY`.
    pub api_key: String,
    /// Secret used to sign QR payloads.
    pub secret_key: String,
    /// How the engine schedules cards.
    pub mode: ExecutionMode,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, applying defaults for absent
    /// keys.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 8000,
        };
        let api_key = lookup("API_KEY").unwrap_or_else(|| "dev-api-key".to_string());
        let secret_key = lookup("SECRET_KEY").unwrap_or_else(|| "dev-secret-key".to_string());
        let mode = match lookup("GENERATION_MODE") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("GENERATION_MODE: {e}")))?,
            None => ExecutionMode::default(),
        };

        if api_key.is_empty() {
            return Err(AppError::Config("API_KEY must not be empty".to_string()));
        }

        Ok(Self {
            host,
            port,
            api_key,
            secret_key,
            mode,
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}
