use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;

use super::{SupabaseBackend, callback_params, check, read_json, transport};
use crate::repository::{AuthBackend, AuthChange, AuthSession, AuthUser, StorageError};

const OAUTH_SCOPES: &str = "openid profile email";

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            user: self.user,
        }
    }
}

impl SupabaseBackend {
    async fn fetch_user(&self, token: &str) -> Result<AuthUser, StorageError> {
        let response = self
            .request_with_token(Method::GET, "auth/v1/user", token)
            .send()
            .await
            .map_err(transport)?;
        read_json(check(response).await?).await
    }

    async fn adopt(&self, session: AuthSession) -> AuthSession {
        self.store_session(Some(session.clone())).await;
        tracing::info!(user = %session.user.id, "auth session started");
        self.announce(AuthChange::SignedIn(session.user.clone()));
        session
    }
}

#[async_trait]
impl AuthBackend for SupabaseBackend {
    async fn get_session(&self) -> Result<Option<AuthSession>, StorageError> {
        Ok(self.inner.session.read().await.clone())
    }

    async fn get_user(&self) -> Result<Option<AuthUser>, StorageError> {
        let Some(token) = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
        else {
            return Ok(None);
        };
        match self.fetch_user(&token).await {
            Ok(user) => Ok(Some(user)),
            Err(StorageError::Unauthorized(reason)) => {
                tracing::warn!(%reason, "session token rejected, dropping session");
                self.store_session(None).await;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StorageError> {
        let response = self
            .request(Method::POST, "auth/v1/token")
            .await
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(transport)?;
        let body: TokenResponse = match check(response).await {
            Ok(response) => read_json(response).await?,
            // Bad credentials come back as 400 invalid_grant.
            Err(StorageError::Rejected {
                status: 400,
                message,
            }) => return Err(StorageError::Unauthorized(message)),
            Err(err) => return Err(err),
        };
        Ok(self.adopt(body.into_session()).await)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<Option<AuthSession>, StorageError> {
        let mut request = self.request(Method::POST, "auth/v1/signup").await;
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        let response = request
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(transport)?;
        let body: serde_json::Value = match check(response).await {
            Ok(response) => read_json(response).await?,
            Err(StorageError::Rejected { message, .. })
                if message.to_ascii_lowercase().contains("already registered") =>
            {
                return Err(StorageError::Conflict);
            }
            Err(err) => return Err(err),
        };

        // Without email confirmation the signup response is a full session;
        // otherwise it is just the pending user.
        if body.get("access_token").is_none() {
            tracing::info!("sign-up pending email confirmation");
            return Ok(None);
        }
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Some(self.adopt(token.into_session()).await))
    }

    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<String, StorageError> {
        let mut url = Url::parse(&self.endpoint("auth/v1/authorize"))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("scopes", OAUTH_SCOPES);
        Ok(url.to_string())
    }

    async fn complete_oauth_redirect(
        &self,
        callback_url: &str,
    ) -> Result<Option<AuthSession>, StorageError> {
        let params = callback_params(callback_url);
        if let Some(description) = params.get("error_description") {
            return Err(StorageError::Unauthorized(description.clone()));
        }
        let Some(access_token) = params.get("access_token").filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let user = self.fetch_user(access_token).await?;
        let session = AuthSession {
            access_token: access_token.clone(),
            refresh_token: params.get("refresh_token").cloned(),
            expires_at: params
                .get("expires_in")
                .and_then(|raw| raw.parse::<i64>().ok())
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            user,
        };
        Ok(Some(self.adopt(session).await))
    }

    async fn sign_out(&self) -> Result<(), StorageError> {
        let Some(session) = self.inner.session.read().await.clone() else {
            return Ok(());
        };
        let remote = self
            .request_with_token(Method::POST, "auth/v1/logout", &session.access_token)
            .send()
            .await
            .map_err(transport);
        match remote {
            Ok(response) => {
                if let Err(err) = check(response).await {
                    tracing::warn!(error = %err, "remote sign-out failed, clearing local session");
                }
            }
            Err(err) => tracing::warn!(error = %err, "remote sign-out failed, clearing local session"),
        }
        self.store_session(None).await;
        self.announce(AuthChange::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.inner.changes.subscribe()
    }
}
