use hub_core::model::{Category, ProgressError, ProgressRecord, User};
use services::export::export_progress;
use services::{
    AuthError, ExportError, ExportFormat, FlushOutcome, ProfileError, ProgressExport,
    ProgressServiceError, SignUpOutcome, TeardownReason,
};
use thiserror::Error;

use crate::router::{RouteOutcome, Router};
use crate::routes::{DEFAULT_AUTHENTICATED, LOGIN, Page};

pub const CONFIRM_EMAIL_NOTICE: &str = "Check your email to confirm your account, then sign in.";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActionError {
    #[error("sign in first")]
    NotSignedIn,

    #[error("open a curriculum page first")]
    NoActiveCategory,

    #[error("no tracked page is open")]
    NoTrackedPage,

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Save(#[from] ProgressServiceError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("invalid callback url: {0}")]
    CallbackUrl(#[from] url::ParseError),
}

/// Page actions. Edits land in the state store at once and reach the
/// backend through the debounced auto-save.
impl Router {
    fn active_category(&self) -> Result<Category, ActionError> {
        self.context()
            .state()
            .current_category()
            .ok_or(ActionError::NoActiveCategory)
    }

    fn signed_in_user(&self) -> Result<User, ActionError> {
        self.context()
            .state()
            .current_user()
            .ok_or(ActionError::NotSignedIn)
    }

    /// Active category, loaded for the signed-in user so edits never land
    /// on a placeholder record.
    async fn editable_category(&self) -> Result<Category, ActionError> {
        let category = self.active_category()?;
        self.context().progress().ensure_loaded(category).await?;
        Ok(category)
    }

    async fn after_edit(&self, category: Category) {
        self.context().autosave().schedule_save();
        self.refresh(Page::Curriculum(category)).await;
    }

    /// Flip one day of the active curriculum; returns the new flag.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NoActiveCategory` outside a curriculum page and
    /// `ActionError::Progress` for a day the curriculum does not have.
    pub async fn toggle_day(&self, index: usize) -> Result<bool, ActionError> {
        let category = self.editable_category().await?;
        let done = self
            .context()
            .state()
            .update_progress(category, |record| record.toggle_day(index))?;
        self.after_edit(category).await;
        Ok(done)
    }

    /// # Errors
    ///
    /// Same as [`Router::toggle_day`].
    pub async fn set_day(&self, index: usize, done: bool) -> Result<(), ActionError> {
        let category = self.editable_category().await?;
        self.context()
            .state()
            .update_progress(category, |record| record.set_day(index, done))?;
        self.after_edit(category).await;
        Ok(())
    }

    /// Replace a day's note; blank text removes it.
    ///
    /// # Errors
    ///
    /// Same as [`Router::toggle_day`].
    pub async fn update_note(&self, index: usize, text: &str) -> Result<(), ActionError> {
        let category = self.editable_category().await?;
        self.context()
            .state()
            .update_progress(category, |record| record.set_note(index, text))?;
        self.after_edit(category).await;
        Ok(())
    }

    /// Save the active curriculum right away. A pending auto-save still
    /// runs; both are idempotent upserts.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Save` if there is nothing to save or the write fails.
    pub async fn save_now(&self) -> Result<ProgressRecord, ActionError> {
        let saved = self.context().progress().save_current().await?;
        self.refresh(Page::Curriculum(saved.category())).await;
        Ok(saved)
    }

    /// Record a `complete` event for the page on screen and flush.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NoTrackedPage` outside a curriculum page.
    pub async fn mark_page_complete(&self) -> Result<(), ActionError> {
        let tracker = self
            .active_tracker()
            .await
            .ok_or(ActionError::NoTrackedPage)?;
        tracker.mark_complete().await;
        Ok(())
    }

    /// Document visibility changed.
    pub async fn set_page_visible(&self, visible: bool) {
        if let Some(tracker) = self.active_tracker().await {
            tracker.set_visible(visible);
        }
    }

    /// Tab close or mobile page-hide.
    pub async fn page_hidden(&self, reason: TeardownReason) {
        self.shutdown(reason).await;
    }

    pub async fn connectivity_changed(&self, online: bool) -> FlushOutcome {
        self.context().events().on_connectivity_change(online).await
    }

    /// # Errors
    ///
    /// Returns `ActionError::Auth`; the message is also shown on the login page.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<RouteOutcome, ActionError> {
        match self.context().auth().sign_in(email, password).await {
            Ok(_) => Ok(self.navigate_to(DEFAULT_AUTHENTICATED).await),
            Err(err) => {
                self.show_login_message(Some(err.to_string()), None);
                Err(err.into())
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ActionError::Auth`; the message is also shown on the login page.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ActionError> {
        match self.context().auth().sign_up(email, password).await {
            Ok(outcome @ SignUpOutcome::SignedIn(_)) => {
                self.navigate_to(DEFAULT_AUTHENTICATED).await;
                Ok(outcome)
            }
            Ok(SignUpOutcome::ConfirmationRequired) => {
                self.show_login_message(None, Some(CONFIRM_EMAIL_NOTICE.to_string()));
                Ok(SignUpOutcome::ConfirmationRequired)
            }
            Err(err) => {
                self.show_login_message(Some(err.to_string()), None);
                Err(err.into())
            }
        }
    }

    /// Authorize URL the browser should open for Google sign-in.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Auth`; the message is also shown on the login page.
    pub async fn google_sign_in(&self) -> Result<String, ActionError> {
        self.context().auth().google_sign_in_url().await.map_err(|err| {
            self.show_login_message(Some(err.to_string()), None);
            err.into()
        })
    }

    /// The provider sent the browser back to `callback_url`.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::CallbackUrl` if the URL is not absolute.
    pub async fn complete_oauth(&self, callback_url: &str) -> Result<RouteOutcome, ActionError> {
        self.location().replace_url(callback_url)?;
        Ok(self.bootstrap().await)
    }

    /// End the session locally even when the backend call fails.
    pub async fn sign_out(&self) -> RouteOutcome {
        self.end_session().await;
        if let Err(err) = self.context().auth().sign_out().await {
            tracing::warn!(error = %err, "backend sign-out failed");
        }
        self.navigate_to(LOGIN).await
    }

    /// Export the active curriculum for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NotSignedIn`, `ActionError::NoActiveCategory` or
    /// `ActionError::Export`.
    pub fn export(&self, format: ExportFormat) -> Result<ProgressExport, ActionError> {
        let user = self.signed_in_user()?;
        let category = self.active_category()?;
        let record = self.context().state().progress(category);
        Ok(export_progress(&user, &record, format, &self.context().clock())?)
    }

    /// Upload a resume for the signed-in user and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NotSignedIn` or `ActionError::Profile`.
    pub async fn upload_resume(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ActionError> {
        let user = self.signed_in_user()?;
        let url = self
            .context()
            .profiles()
            .upload_resume(&user, file_name, bytes)
            .await?;
        self.refresh(Page::Dashboard).await;
        Ok(url)
    }
}
