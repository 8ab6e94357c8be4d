use crate::error::ConfigError;
use crate::settings::RawSettings;
use std::collections::HashMap;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{AppEnvironment, PublicConfig, Settings, MAX_CACHE_TTL_SECS};

/// Loads the application settings from `config.toml` (optional) and the process environment.
///
/// Sources are layered: built-in defaults, then the file, then environment
/// variables (`BACKEND_URL`, `BACKEND_ANON_KEY`, `DEBUG_MODE`, ...). Call
/// `dotenvy::dotenv()` first if a `.env` file should take part.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(None, None)
}

/// Same as [`load_settings`], with an explicit config file and/or a fixed
/// environment map in place of the process environment.
pub fn load_settings_from(
    file: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<Settings, ConfigError> {
    let file_source = match file {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config").required(false),
    };

    let builder = config::Config::builder()
        .set_default("debug_mode", false)?
        .set_default("app_env", "development")?
        .set_default("server_addr", "0.0.0.0:3000")?
        .set_default("cache_ttl_secs", 30_i64)?
        .add_source(file_source)
        .add_source(config::Environment::default().try_parsing(true).source(env))
        .build()?;

    let raw = builder.try_deserialize::<RawSettings>()?;
    Settings::from_raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // An empty file keeps a stray ./config.toml out of the test.
    fn empty_file() -> std::path::PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        std::mem::forget(dir);
        path
    }

    #[test]
    fn environment_values_are_validated_and_defaulted() {
        let settings = load_settings_from(
            Some(&empty_file()),
            Some(env(&[
                ("BACKEND_URL", "https://demo.example.co/"),
                ("BACKEND_ANON_KEY", "anon"),
                ("BACKEND_SERVICE_ROLE_KEY", "service"),
            ])),
        )
        .unwrap();

        assert_eq!(settings.backend_url, "https://demo.example.co");
        assert_eq!(settings.app_env, AppEnvironment::Development);
        assert!(!settings.debug_mode);
        assert_eq!(settings.cache_ttl, Duration::from_secs(30));
        assert_eq!(settings.service_role_key(), Some("service"));
        assert!(settings.database_url().is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "backend_url = \"https://file.example.co\"\nbackend_anon_key = \"file-key\"\ndebug_mode = true\napp_env = \"staging\"\ncache_ttl_secs = 5"
        )
        .unwrap();

        let settings = load_settings_from(
            Some(file.path()),
            Some(env(&[("BACKEND_ANON_KEY", "env-key"), ("APP_ENV", "production")])),
        )
        .unwrap();

        assert_eq!(settings.backend_url, "https://file.example.co");
        assert_eq!(settings.backend_anon_key, "env-key");
        assert!(settings.debug_mode);
        assert!(settings.is_production());
        assert_eq!(settings.cache_ttl, Duration::from_secs(5));
    }

    #[test]
    fn non_http_backend_url_is_rejected() {
        let err = load_settings_from(
            Some(&empty_file()),
            Some(env(&[("BACKEND_URL", "ftp://nope"), ("BACKEND_ANON_KEY", "anon")])),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn cache_ttl_is_bounded() {
        for ttl in ["0", "86401", "18446744073709551615"] {
            let err = load_settings_from(
                Some(&empty_file()),
                Some(env(&[
                    ("BACKEND_URL", "https://demo.example.co"),
                    ("BACKEND_ANON_KEY", "anon"),
                    ("CACHE_TTL_SECS", ttl),
                ])),
            )
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::ValidationError(_) | ConfigError::LoadError(_)),
                "{}",
                ttl
            );
        }

        let settings = load_settings_from(
            Some(&empty_file()),
            Some(env(&[
                ("BACKEND_URL", "https://demo.example.co"),
                ("BACKEND_ANON_KEY", "anon"),
                ("CACHE_TTL_SECS", "86400"),
            ])),
        )
        .unwrap();
        assert_eq!(settings.cache_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn public_config_never_carries_secrets() {
        let settings = load_settings_from(
            Some(&empty_file()),
            Some(env(&[
                ("BACKEND_URL", "https://demo.example.co"),
                ("BACKEND_ANON_KEY", "anon"),
                ("BACKEND_SERVICE_ROLE_KEY", "very-secret"),
                ("DATABASE_URL", "postgres://user:pw@localhost/db"),
            ])),
        )
        .unwrap();

        let printed = format!("{:?} {:?}", settings, settings.public());
        assert!(!printed.contains("very-secret"));
        assert!(!printed.contains("pw@localhost"));
        assert_eq!(settings.database_url().unwrap(), "postgres://user:pw@localhost/db");
    }
}
