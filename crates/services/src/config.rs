use std::env;

use reqwest::Client;
use reqwest::header::CACHE_CONTROL;

use crate::autosave::AutoSaveConfig;
use crate::error::ConfigError;
use crate::telemetry::QueueConfig;

/// Public connection parameters for the hosted backend, as served by the
/// configuration endpoint (`{url, anonKey}`).
pub use storage::supabase::SupabaseConfig as BackendConfig;

pub const ENV_BACKEND_URL: &str = "HUB_SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "HUB_SUPABASE_ANON_KEY";
pub const ENV_LOCAL_DB: &str = "HUB_LOCAL_DB";
pub const ENV_SITE_ORIGIN: &str = "HUB_SITE_ORIGIN";

pub const DEFAULT_LOCAL_DB: &str = "sqlite://hub-local.sqlite3";
pub const DEFAULT_SITE_ORIGIN: &str = "http://localhost:3000";

/// Check that both backend values are present.
///
/// # Errors
///
/// Returns `ConfigError::Incomplete` naming the first missing value.
pub fn validate_backend(config: BackendConfig) -> Result<BackendConfig, ConfigError> {
    if config.url.trim().is_empty() {
        return Err(ConfigError::Incomplete { missing: "url" });
    }
    if config.anon_key.trim().is_empty() {
        return Err(ConfigError::Incomplete { missing: "anonKey" });
    }
    Ok(config)
}

/// Read backend parameters through `lookup` (usually the process environment).
///
/// # Errors
///
/// Returns `ConfigError::Incomplete` if either variable is unset or blank.
pub fn backend_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BackendConfig, ConfigError> {
    let url = lookup(ENV_BACKEND_URL).unwrap_or_default();
    let anon_key = lookup(ENV_ANON_KEY).unwrap_or_default();
    validate_backend(BackendConfig::new(url, anon_key))
}

/// # Errors
///
/// Returns `ConfigError::Incomplete` if either variable is unset or blank.
pub fn backend_from_env() -> Result<BackendConfig, ConfigError> {
    backend_from_lookup(|key| env::var(key).ok())
}

/// Fetch backend parameters from the configuration endpoint, bypassing caches.
///
/// # Errors
///
/// Returns `ConfigError::Unavailable` for a non-success status,
/// `ConfigError::Malformed` for an unreadable body, `ConfigError::Incomplete`
/// for missing values and `ConfigError::Http` for transport failures.
pub async fn fetch_backend_config(
    client: &Client,
    config_url: &str,
) -> Result<BackendConfig, ConfigError> {
    let response = client
        .get(config_url)
        .header(CACHE_CONTROL, "no-store")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(ConfigError::Unavailable {
            status: response.status().as_u16(),
        });
    }
    let config: BackendConfig = response
        .json()
        .await
        .map_err(|err| ConfigError::Malformed(err.to_string()))?;
    validate_backend(config)
}

/// Everything the hub needs at startup.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub backend: BackendConfig,
    pub local_db_url: String,
    /// Origin OAuth providers redirect back to.
    pub site_origin: String,
    pub autosave: AutoSaveConfig,
    pub queue: QueueConfig,
}

impl HubConfig {
    /// Defaults for everything but the backend.
    #[must_use]
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            backend,
            local_db_url: DEFAULT_LOCAL_DB.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            autosave: AutoSaveConfig::default(),
            queue: QueueConfig::default(),
        }
    }

    /// Apply `HUB_LOCAL_DB` and `HUB_SITE_ORIGIN` from `lookup`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(db) = non_blank(ENV_LOCAL_DB) {
            self.local_db_url = db;
        }
        if let Some(origin) = non_blank(ENV_SITE_ORIGIN) {
            self.site_origin = origin;
        }
        self
    }

    /// Backend from the environment plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Incomplete` if backend variables are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = backend_from_env()?;
        Ok(Self::new(backend).with_overrides(|key| env::var(key).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_anon_key_is_incomplete() {
        let err = backend_from_lookup(lookup(&[(ENV_BACKEND_URL, "https://x.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Incomplete { missing: "anonKey" }));
    }

    #[test]
    fn overrides_replace_defaults() {
        let backend = BackendConfig::new("https://x.supabase.co", "k");
        let config = HubConfig::new(backend).with_overrides(lookup(&[
            (ENV_LOCAL_DB, "sqlite::memory:"),
            (ENV_SITE_ORIGIN, " "),
        ]));
        assert_eq!(config.local_db_url, "sqlite::memory:");
        assert_eq!(config.site_origin, DEFAULT_SITE_ORIGIN);
        assert_eq!(config.queue.flush_threshold, 12);
    }

    #[tokio::test]
    async fn fetches_config_endpoint() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/config")
            .match_header("cache-control", "no-store")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"url":"https://x.supabase.co","anonKey":"k"}"#)
            .create_async()
            .await;

        let config = fetch_backend_config(&Client::new(), &format!("{}/api/config", server.url()))
            .await
            .unwrap();
        assert_eq!(config, BackendConfig::new("https://x.supabase.co", "k"));
    }

    #[tokio::test]
    async fn endpoint_error_is_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/config")
            .with_status(500)
            .with_body(r#"{"error":"Supabase configuration not found"}"#)
            .create_async()
            .await;

        let err = fetch_backend_config(&Client::new(), &format!("{}/api/config", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Unavailable { status: 500 }));
    }
}
