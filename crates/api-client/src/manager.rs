//! Process-wide ownership of the hosted auth client.
//!
//! Every part of the server must talk to the auth API through one
//! `reqwest::Client` (one connection pool, one set of default headers).
//! `shared_client` hands out that instance and refuses to build a second one.

use crate::error::ApiError;
use crate::HostedAuthClient;
use configuration::Settings;
use std::sync::{Arc, OnceLock};

static SHARED_CLIENT: OnceLock<Arc<HostedAuthClient>> = OnceLock::new();

/// Returns the process-wide auth client, creating it from `settings` on first use.
///
/// Later calls return the same instance. A call with a different backend URL
/// is logged and still answered with the existing client.
pub fn shared_client(settings: &Settings) -> Result<Arc<HostedAuthClient>, ApiError> {
    get_or_create(&SHARED_CLIENT, &settings.backend_url, &settings.backend_anon_key)
}

fn get_or_create(
    cell: &OnceLock<Arc<HostedAuthClient>>,
    base_url: &str,
    anon_key: &str,
) -> Result<Arc<HostedAuthClient>, ApiError> {
    if let Some(existing) = cell.get() {
        if existing.base_url() != base_url.trim_end_matches('/') {
            tracing::warn!(
                existing = existing.base_url(),
                requested = base_url,
                "Auth client already initialised for another backend; reusing it."
            );
        }
        return Ok(Arc::clone(existing));
    }

    let client = Arc::new(HostedAuthClient::new(base_url, anon_key)?);
    // Two racing initialisers both build a client; only the first one is kept.
    let kept = cell.get_or_init(|| {
        tracing::debug!(base_url, "Auth client initialised.");
        client
    });
    Ok(Arc::clone(kept))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_calls_share_one_instance() {
        let cell = OnceLock::new();
        let first = get_or_create(&cell, "https://a.example.co", "anon").unwrap();
        let second = get_or_create(&cell, "https://a.example.co/", "anon").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn a_second_backend_does_not_replace_the_first() {
        let cell = OnceLock::new();
        let first = get_or_create(&cell, "https://a.example.co", "anon").unwrap();
        let second = get_or_create(&cell, "https://b.example.co", "anon").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.base_url(), "https://a.example.co");
    }

    #[test]
    fn invalid_anon_key_fails_without_poisoning_the_cell() {
        let cell = OnceLock::new();
        assert!(get_or_create(&cell, "https://a.example.co", "bad\nkey").is_err());
        assert!(cell.get().is_none());
        assert!(get_or_create(&cell, "https://a.example.co", "anon").is_ok());
    }
}
