use std::sync::Arc;

use hub_core::model::{DEFAULT_COHORT, Role, User};
use storage::repository::{
    AuthBackend, AuthChange, AuthUser, ProfileRepository, ProfileRow, StorageError,
};
use tokio::sync::broadcast;

use crate::error::AuthError;
use crate::state_store::StateStore;

const GOOGLE_PROVIDER: &str = "google";

/// Result of an email sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(User),
    /// The account exists but the email must be confirmed first.
    ConfirmationRequired,
}

/// Identity operations plus the merge of auth users with their profile rows.
#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthBackend>,
    profiles: Arc<dyn ProfileRepository>,
    state: StateStore,
    site_origin: String,
}

impl AuthService {
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        profiles: Arc<dyn ProfileRepository>,
        state: StateStore,
        site_origin: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            profiles,
            state,
            site_origin: site_origin.into(),
        }
    }

    /// Resolve the signed-in user and cache it in the state store.
    ///
    /// A failed profile lookup degrades to defaults (role intern, cohort
    /// "default") instead of failing the whole resolution.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the auth backend cannot be reached.
    pub async fn current_user(&self) -> Result<Option<User>, AuthError> {
        let Some(auth_user) = self.auth.get_user().await? else {
            self.state.set_user(None);
            return Ok(None);
        };
        let user = self.merge_profile(auth_user).await;
        self.state.set_user(Some(user.clone()));
        Ok(Some(user))
    }

    async fn merge_profile(&self, auth_user: AuthUser) -> User {
        let profile = match self.profiles.get_profile(&auth_user.id).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(user = %auth_user.id, error = %err, "profile lookup failed, using defaults");
                None
            }
        };
        user_from_parts(&auth_user, profile.as_ref())
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` for blank input and
    /// `AuthError::InvalidCredentials` when the backend refuses them.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let session = self
            .auth
            .sign_in_with_password(email, password)
            .await
            .map_err(|err| match err {
                StorageError::Unauthorized(message) => AuthError::InvalidCredentials(message),
                other => AuthError::Storage(other),
            })?;
        let user = self.merge_profile(session.user).await;
        self.state.set_user(Some(user.clone()));
        tracing::info!(user = %user.id, role = %user.role, "signed in");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` for blank input and
    /// `AuthError::EmailTaken` for an existing account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let redirect = self.dashboard_redirect();
        let session = self
            .auth
            .sign_up(email, password, Some(&redirect))
            .await
            .map_err(|err| match err {
                StorageError::Conflict => AuthError::EmailTaken,
                other => AuthError::Storage(other),
            })?;
        let Some(session) = session else {
            return Ok(SignUpOutcome::ConfirmationRequired);
        };
        let user = self.merge_profile(session.user).await;
        self.state.set_user(Some(user.clone()));
        Ok(SignUpOutcome::SignedIn(user))
    }

    /// Authorize URL for Google sign-in; the provider redirects back to the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::OAuth` if the backend cannot build the URL.
    pub async fn google_sign_in_url(&self) -> Result<String, AuthError> {
        self.auth
            .sign_in_with_oauth(GOOGLE_PROVIDER, &self.dashboard_redirect())
            .await
            .map_err(|err| AuthError::OAuth(err.to_string()))
    }

    /// Adopt the session carried by an OAuth redirect URL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::OAuth` if the provider reported an error or the
    /// token was rejected.
    pub async fn complete_oauth(&self, callback_url: &str) -> Result<Option<User>, AuthError> {
        let session = self
            .auth
            .complete_oauth_redirect(callback_url)
            .await
            .map_err(|err| AuthError::OAuth(err.to_string()))?;
        let Some(session) = session else {
            return Ok(None);
        };
        let user = self.merge_profile(session.user).await;
        self.state.set_user(Some(user.clone()));
        Ok(Some(user))
    }

    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend refuses to end the session.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await?;
        self.state.clear();
        tracing::info!("signed out");
        Ok(())
    }

    /// Auth state changes pushed by the backend.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.auth.subscribe()
    }

    /// Merge a pushed auth user with its profile and store it.
    pub async fn adopt(&self, auth_user: AuthUser) -> User {
        let user = self.merge_profile(auth_user).await;
        self.state.set_user(Some(user.clone()));
        user
    }

    fn dashboard_redirect(&self) -> String {
        format!("{}/#dashboard", self.site_origin.trim_end_matches('/'))
    }
}

fn user_from_parts(auth_user: &AuthUser, profile: Option<&ProfileRow>) -> User {
    let email = profile
        .and_then(|p| p.email.clone())
        .or_else(|| auth_user.email.clone())
        .unwrap_or_default();
    let mut user = User::new(auth_user.id.clone(), email)
        .with_role(Role::from_backend(profile.and_then(|p| p.role.as_deref())));
    user.full_name = profile
        .and_then(|p| p.full_name.clone())
        .filter(|name| !name.trim().is_empty())
        .or_else(|| auth_user.full_name().map(str::to_string));
    user.cohort = profile
        .and_then(|p| p.cohort.clone())
        .filter(|cohort| !cohort.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COHORT.to_string());
    user.resume_url = profile.and_then(|p| p.resume_url.clone());
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hub_core::model::UserId;
    use storage::InMemoryBackend;
    use storage::repository::InternOverviewRow;

    fn service(backend: &InMemoryBackend) -> (AuthService, StateStore) {
        let state = StateStore::new();
        let service = AuthService::new(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            state.clone(),
            "https://hub.example.com/",
        );
        (service, state)
    }

    struct BrokenProfiles;

    #[async_trait]
    impl ProfileRepository for BrokenProfiles {
        async fn get_profile(&self, _id: &UserId) -> Result<Option<ProfileRow>, StorageError> {
            Err(StorageError::Connection("profiles offline".into()))
        }

        async fn list_interns_with_progress(
            &self,
        ) -> Result<Vec<InternOverviewRow>, StorageError> {
            Err(StorageError::Connection("profiles offline".into()))
        }

        async fn set_resume_url(&self, _id: &UserId, _url: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("profiles offline".into()))
        }
    }

    #[tokio::test]
    async fn sign_in_merges_profile_and_caches_user() {
        let backend = InMemoryBackend::new();
        let auth_user = backend.register("boss@example.com", "pw", "admin").unwrap();
        let mut profile = ProfileRow::intern(auth_user.id.clone(), "boss@example.com");
        profile.role = Some("admin".into());
        profile.full_name = Some("The Boss".into());
        profile.cohort = Some("spring".into());
        backend.put_profile(profile).unwrap();

        let (service, state) = service(&backend);
        let user = service.sign_in(" boss@example.com ", "pw").await.unwrap();
        assert!(user.is_admin());
        assert_eq!(user.display_name(), "The Boss");
        assert_eq!(user.cohort, "spring");
        assert_eq!(state.current_user(), Some(user));
    }

    #[tokio::test]
    async fn wrong_password_is_user_visible() {
        let backend = InMemoryBackend::new();
        backend.register("a@example.com", "pw", "intern").unwrap();
        let (service, _) = service(&backend);

        let err = service.sign_in("a@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        let err = service.sign_in("", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn profile_failure_degrades_to_defaults() {
        let backend = InMemoryBackend::new();
        backend.register("a@example.com", "pw", "admin").unwrap();
        let state = StateStore::new();
        let service = AuthService::new(
            Arc::new(backend.clone()),
            Arc::new(BrokenProfiles),
            state,
            "http://localhost",
        );
        let user = service.sign_in("a@example.com", "pw").await.unwrap();
        assert_eq!(user.role, Role::Intern);
        assert_eq!(user.cohort, DEFAULT_COHORT);
        assert_eq!(user.email, "a@example.com");
    }

    #[tokio::test]
    async fn duplicate_sign_up_reports_taken_email() {
        let backend = InMemoryBackend::new();
        let (service, state) = service(&backend);
        let outcome = service.sign_up("new@example.com", "pw").await.unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
        assert!(state.current_user().is_some());

        let err = service.sign_up("new@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn google_redirect_targets_dashboard() {
        let backend = InMemoryBackend::new();
        let (service, _) = service(&backend);
        let url = service.google_sign_in_url().await.unwrap();
        assert!(url.contains("provider=google"));
        assert!(url.contains("hub.example.com%2F%23dashboard"));
    }

    #[tokio::test]
    async fn sign_out_clears_state() {
        let backend = InMemoryBackend::new();
        backend.register("a@example.com", "pw", "intern").unwrap();
        let (service, state) = service(&backend);
        service.sign_in("a@example.com", "pw").await.unwrap();
        assert!(service.current_user().await.unwrap().is_some());

        service.sign_out().await.unwrap();
        assert!(state.current_user().is_none());
        assert!(service.current_user().await.unwrap().is_none());
    }
}
