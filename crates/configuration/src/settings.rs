use crate::error::ConfigError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Cached reads never outlive a day.
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// The deployment stage the service runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Shape of the raw configuration sources, before validation.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSettings {
    pub backend_url: String,
    pub backend_anon_key: String,
    pub backend_service_role_key: Option<String>,
    pub database_url: Option<String>,
    pub debug_mode: bool,
    pub app_env: AppEnvironment,
    pub server_addr: SocketAddr,
    pub cache_ttl_secs: u64,
    pub log_dir: Option<PathBuf>,
}

/// The validated, strongly-typed application settings.
#[derive(Debug)]
pub struct Settings {
    /// Base URL of the hosted auth API (e.g. `https://xyz.example.co`).
    pub backend_url: String,
    /// The anonymous (public) key sent as `apikey` on every auth call.
    pub backend_anon_key: String,
    backend_service_role_key: Option<SecretString>,
    database_url: Option<SecretString>,
    pub debug_mode: bool,
    pub app_env: AppEnvironment,
    pub server_addr: SocketAddr,
    pub cache_ttl: Duration,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub log_dir: Option<PathBuf>,
}

/// The subset of settings that is safe to hand to a browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicConfig {
    pub backend_url: String,
    pub backend_anon_key: String,
    pub app_env: AppEnvironment,
    pub debug_mode: bool,
}

impl Settings {
    pub(crate) fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let backend_url = raw.backend_url.trim().trim_end_matches('/').to_string();
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "BACKEND_URL must be an http(s) URL, got '{}'",
                backend_url
            )));
        }
        if raw.backend_anon_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "BACKEND_ANON_KEY must be set".to_string(),
            ));
        }
        if raw.cache_ttl_secs == 0 || raw.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "CACHE_TTL_SECS must be between 1 and {}, got {}",
                MAX_CACHE_TTL_SECS, raw.cache_ttl_secs
            )));
        }

        let secret = |value: Option<String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| SecretString::new(v.into()))
        };

        Ok(Self {
            backend_url,
            backend_anon_key: raw.backend_anon_key.trim().to_string(),
            backend_service_role_key: secret(raw.backend_service_role_key),
            database_url: secret(raw.database_url),
            debug_mode: raw.debug_mode,
            app_env: raw.app_env,
            server_addr: raw.server_addr,
            cache_ttl: Duration::from_secs(raw.cache_ttl_secs),
            log_dir: raw.log_dir,
        })
    }

    /// Server-only key. Never serialized and never part of `public()`.
    pub fn service_role_key(&self) -> Option<&str> {
        self.backend_service_role_key
            .as_ref()
            .map(|k| k.expose_secret())
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_ref()
            .map(|u| u.expose_secret())
            .ok_or_else(|| ConfigError::ValidationError("DATABASE_URL must be set".to_string()))
    }

    pub fn public(&self) -> PublicConfig {
        PublicConfig {
            backend_url: self.backend_url.clone(),
            backend_anon_key: self.backend_anon_key.clone(),
            app_env: self.app_env,
            debug_mode: self.debug_mode,
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnvironment::Production
    }
}
