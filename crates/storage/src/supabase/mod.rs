//! Adapter for the hosted backend: auth (GoTrue), tables (PostgREST) and
//! file storage, all spoken over HTTPS with `reqwest`.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use url::Url;

use crate::repository::{AuthChange, AuthSession, Backend, StorageError};

mod auth;
mod files;
mod rest;

const AUTH_CHANNEL_CAPACITY: usize = 16;

/// Public connection parameters of the hosted backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    #[serde(rename = "anonKey")]
    pub anon_key: String,
}

impl SupabaseConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }

    /// Both values present and non-blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

struct Inner {
    client: Client,
    config: SupabaseConfig,
    session: RwLock<Option<AuthSession>>,
    changes: broadcast::Sender<AuthChange>,
}

/// Hosted backend client. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct SupabaseBackend {
    inner: Arc<Inner>,
}

impl SupabaseBackend {
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the config is incomplete or the
    /// base URL does not parse.
    pub fn new(config: SupabaseConfig) -> Result<Self, StorageError> {
        if !config.is_complete() {
            return Err(StorageError::Connection(
                "backend url and anon key are required".to_string(),
            ));
        }
        Url::parse(&config.url).map_err(|e| StorageError::Connection(e.to_string()))?;
        let (changes, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                client: Client::new(),
                config,
                session: RwLock::new(None),
                changes,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SupabaseConfig {
        &self.inner.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.config.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Request carrying the project key and the session token (or the anon
    /// key when signed out).
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map_or_else(|| self.inner.config.anon_key.clone(), |s| s.access_token.clone());
        self.request_with_token(method, path, &token)
    }

    fn request_with_token(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, self.endpoint(path))
            .header("apikey", &self.inner.config.anon_key)
            .bearer_auth(token)
    }

    async fn store_session(&self, session: Option<AuthSession>) {
        *self.inner.session.write().await = session;
    }

    fn announce(&self, change: AuthChange) {
        let _ = self.inner.changes.send(change);
    }
}

impl Backend {
    /// Build a `Backend` whose facets all talk to the hosted service.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` for an unusable config.
    pub fn supabase(config: SupabaseConfig) -> Result<Self, StorageError> {
        let backend = SupabaseBackend::new(config)?;
        Ok(Self {
            auth: Arc::new(backend.clone()),
            progress: Arc::new(backend.clone()),
            profiles: Arc::new(backend.clone()),
            events: Arc::new(backend.clone()),
            files: Arc::new(backend),
        })
    }
}

fn transport(err: reqwest::Error) -> StorageError {
    StorageError::Connection(err.to_string())
}

/// Pass successful responses through, map failures onto `StorageError`.
async fn check(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Unauthorized(message),
        StatusCode::NOT_FOUND => StorageError::NotFound,
        StatusCode::CONFLICT => StorageError::Conflict,
        other => StorageError::Rejected {
            status: other.as_u16(),
            message,
        },
    })
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StorageError> {
    response
        .json()
        .await
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Key/value pairs carried by an OAuth redirect, fragment first, then query.
#[must_use]
pub fn callback_params(callback_url: &str) -> HashMap<String, String> {
    let raw = callback_url.trim();
    let (before, fragment) = raw.split_once('#').unwrap_or((raw, ""));
    let query = before.split_once('?').map_or("", |(_, q)| q);
    let mut params: HashMap<String, String> = HashMap::new();
    for source in [fragment.trim_start_matches('/'), query] {
        for (key, value) in url::form_urlencoded::parse(source.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }
    params
}

/// The `access_token` an OAuth redirect carries, if any.
#[must_use]
pub fn access_token_from_callback(callback_url: &str) -> Option<String> {
    callback_params(callback_url)
        .remove("access_token")
        .filter(|token| !token.is_empty())
}
