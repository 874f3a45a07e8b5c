//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::batch::DEFAULT_MAX_BATCH_SIZE;
use crate::registry::DEFAULT_MAX_PAGE_SIZE;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Only ever used for local development
const DEV_JWT_SECRET: &str = "curated-registry-dev-secret-change-in-production";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Bearer token configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Expose `/api/auth/dev-token`, never enable in production
    pub allow_dev_tokens: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            allow_dev_tokens: false,
        }
    }
}

/// A field registered at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedField {
    pub name: String,
    pub required: bool,
}

/// Registry and initial policy configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub governor: String,
    pub curators: Vec<String>,
    pub trusted_delegates: Vec<String>,
    pub open_submissions: bool,
    pub max_page_size: usize,
    pub max_batch_size: usize,
    pub seed_fields: Vec<SeedField>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            governor: "governor".to_string(),
            curators: Vec::new(),
            trusted_delegates: Vec::new(),
            open_submissions: true,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            seed_fields: Vec::new(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub registry: RegistryConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build settings from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let server = ServerConfig {
            host: parse_or(&lookup, "HOST", defaults.server.host)?,
            port: parse_or(&lookup, "PORT", defaults.server.port)?,
        };

        let cors = CorsConfig {
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors.allowed_origins),
        };

        let auth = AuthConfig {
            jwt_secret: lookup("JWT_SECRET").unwrap_or_else(|| {
                warn!("⚠️  JWT_SECRET not set, using default (INSECURE - set in production!)");
                defaults.auth.jwt_secret.clone()
            }),
            allow_dev_tokens: parse_or(
                &lookup,
                "ALLOW_DEV_TOKENS",
                defaults.auth.allow_dev_tokens,
            )?,
        };

        let registry = RegistryConfig {
            governor: lookup("REGISTRY_GOVERNOR")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.registry.governor),
            curators: lookup("REGISTRY_CURATORS").map(|s| split_list(&s)).unwrap_or_default(),
            trusted_delegates: lookup("REGISTRY_TRUSTED_DELEGATES")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            open_submissions: parse_or(
                &lookup,
                "REGISTRY_OPEN_SUBMISSIONS",
                defaults.registry.open_submissions,
            )?,
            max_page_size: parse_or(
                &lookup,
                "REGISTRY_MAX_PAGE_SIZE",
                defaults.registry.max_page_size,
            )?,
            max_batch_size: parse_or(
                &lookup,
                "REGISTRY_MAX_BATCH_SIZE",
                defaults.registry.max_batch_size,
            )?,
            seed_fields: lookup("REGISTRY_SEED_FIELDS")
                .map(|s| parse_seed_fields(&s))
                .transpose()?
                .unwrap_or_default(),
        };

        Ok(Self {
            server,
            cors,
            auth,
            registry,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value,
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `logoURI:required,website` -> two fields, the first one required
fn parse_seed_fields(raw: &str) -> Result<Vec<SeedField>, ConfigError> {
    split_list(raw)
        .into_iter()
        .map(|item| match item.split_once(':') {
            None => Ok(SeedField {
                name: item.clone(),
                required: false,
            }),
            Some((name, "required")) => Ok(SeedField {
                name: name.trim().to_string(),
                required: true,
            }),
            Some((name, "optional")) => Ok(SeedField {
                name: name.trim().to_string(),
                required: false,
            }),
            Some(_) => Err(ConfigError::InvalidValue {
                var: "REGISTRY_SEED_FIELDS".to_string(),
                value: item.clone(),
            }),
        })
        .collect()
}
