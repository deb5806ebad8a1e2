// ABOUTME: Environment-based configuration for the coaching stream server
// ABOUTME: Builds an immutable ServerConfig for provider access, timeouts, and context budget
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration
//!
//! Configuration is read once at process start and handed to each component
//! as an `Arc<ServerConfig>`. Nothing downstream reads the environment.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::constants::{defaults, env_vars};
use crate::errors::{AppError, AppResult};
use crate::intelligence::CoachContext;
use crate::llm::prompts::COACH_SYSTEM_PROMPT;

/// Upstream language-model provider settings
#[derive(Clone)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API (e.g. `http://localhost:11434/v1`)
    pub endpoint: String,
    /// Bearer credential, if the provider requires one
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Maximum time to establish the upstream stream
    pub connect_timeout: Duration,
    /// Maximum silence between upstream chunks once streaming
    pub stall_timeout: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("connect_timeout", &self.connect_timeout)
            .field("stall_timeout", &self.stall_timeout)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::PROVIDER_ENDPOINT.to_owned(),
            api_key: None,
            model: defaults::PROVIDER_MODEL.to_owned(),
            connect_timeout: Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS),
            stall_timeout: Duration::from_secs(defaults::STALL_TIMEOUT_SECS),
        }
    }
}

/// Per-session streaming limits
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Wall-clock budget for one coaching stream
    pub request_timeout: Duration,
    /// Maximum serialized size of the coach context, in bytes
    pub context_budget: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            context_budget: defaults::CONTEXT_BUDGET_BYTES,
        }
    }
}

/// Records store settings
#[derive(Debug, Clone)]
pub struct RecordsConfig {
    /// How many days of records feed each summary
    pub lookback_days: u32,
    /// JSON file seeding the in-memory store
    pub seed_path: Option<PathBuf>,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            lookback_days: defaults::RECORDS_LOOKBACK_DAYS,
            seed_path: None,
        }
    }
}

/// Cross-origin settings for browser clients
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated origin list, or `*` for any origin
    pub allowed_origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: defaults::CORS_ALLOWED_ORIGINS.to_owned(),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Upstream provider settings
    pub provider: ProviderConfig,
    /// Streaming limits
    pub stream: StreamConfig,
    /// Records store settings
    pub records: RecordsConfig,
    /// CORS settings
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: defaults::HTTP_PORT,
            provider: ProviderConfig::default(),
            stream: StreamConfig::default(),
            records: RecordsConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or if a
    /// parsed value is out of range (zero timeouts, zero budget, non-HTTP
    /// endpoint).
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        let config = Self {
            http_port: parse_env(env_vars::HTTP_PORT, defaults::HTTP_PORT)?,
            provider: ProviderConfig {
                endpoint: env_var_or(env_vars::PROVIDER_ENDPOINT, defaults::PROVIDER_ENDPOINT),
                api_key: env::var(env_vars::PROVIDER_API_KEY)
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                model: env_var_or(env_vars::PROVIDER_MODEL, defaults::PROVIDER_MODEL),
                connect_timeout: Duration::from_secs(parse_env(
                    env_vars::CONNECT_TIMEOUT_SECS,
                    defaults::CONNECT_TIMEOUT_SECS,
                )?),
                stall_timeout: Duration::from_secs(parse_env(
                    env_vars::STALL_TIMEOUT_SECS,
                    defaults::STALL_TIMEOUT_SECS,
                )?),
            },
            stream: StreamConfig {
                request_timeout: Duration::from_secs(parse_env(
                    env_vars::REQUEST_TIMEOUT_SECS,
                    defaults::REQUEST_TIMEOUT_SECS,
                )?),
                context_budget: parse_env(
                    env_vars::CONTEXT_BUDGET_BYTES,
                    defaults::CONTEXT_BUDGET_BYTES,
                )?,
            },
            records: RecordsConfig {
                lookback_days: parse_env(
                    env_vars::RECORDS_LOOKBACK_DAYS,
                    defaults::RECORDS_LOOKBACK_DAYS,
                )?,
                seed_path: env::var(env_vars::RECORDS_PATH)
                    .ok()
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from),
            },
            cors: CorsConfig {
                allowed_origins: env_var_or(
                    env_vars::CORS_ALLOWED_ORIGINS,
                    defaults::CORS_ALLOWED_ORIGINS,
                ),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` error naming the first offending setting.
    pub fn validate(&self) -> AppResult<()> {
        let endpoint = self.provider.endpoint.as_str();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AppError::config_invalid(
                env_vars::PROVIDER_ENDPOINT,
                format!("expected an http(s) URL, got '{endpoint}'"),
            ));
        }
        if self.provider.model.trim().is_empty() {
            return Err(AppError::config_invalid(
                env_vars::PROVIDER_MODEL,
                "must not be empty",
            ));
        }
        for (key, value) in [
            (env_vars::CONNECT_TIMEOUT_SECS, self.provider.connect_timeout),
            (env_vars::STALL_TIMEOUT_SECS, self.provider.stall_timeout),
            (env_vars::REQUEST_TIMEOUT_SECS, self.stream.request_timeout),
        ] {
            if value.is_zero() {
                return Err(AppError::config_invalid(key, "must be greater than zero"));
            }
        }
        let minimum_budget = CoachContext::minimum_budget(COACH_SYSTEM_PROMPT);
        if self.stream.context_budget < minimum_budget {
            return Err(AppError::config_invalid(
                env_vars::CONTEXT_BUDGET_BYTES,
                format!("must be at least {minimum_budget} bytes to hold the coach system prompt"),
            ));
        }
        if self.records.lookback_days == 0 {
            return Err(AppError::config_invalid(
                env_vars::RECORDS_LOOKBACK_DAYS,
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Human-readable configuration summary for startup logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Pierre Coach Server Configuration:\n\
             - HTTP Port: {}\n\
             - Provider Endpoint: {}\n\
             - Provider Model: {}\n\
             - Provider Credential: {}\n\
             - Connect Timeout: {}s\n\
             - Stall Timeout: {}s\n\
             - Request Timeout: {}s\n\
             - Context Budget: {} bytes\n\
             - Records Lookback: {} days\n\
             - Records Seed: {}\n\
             - CORS Origins: {}",
            self.http_port,
            self.provider.endpoint,
            self.provider.model,
            if self.provider.api_key.is_some() {
                "Configured"
            } else {
                "None"
            },
            self.provider.connect_timeout.as_secs(),
            self.provider.stall_timeout.as_secs(),
            self.stream.request_timeout.as_secs(),
            self.stream.context_budget,
            self.records.lookback_days,
            self.records
                .seed_path
                .as_ref()
                .map_or_else(|| "None".to_owned(), |path| path.display().to_string()),
            self.cors.allowed_origins,
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_env<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::config_invalid(key, format!("'{raw}': {e}"))),
        _ => Ok(default),
    }
}
