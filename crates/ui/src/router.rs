use std::sync::Arc;

use hub_core::model::User;
use services::{PageTimeTracker, TeardownReason};
use storage::repository::AuthChange;
use storage::supabase::callback_params;
use tokio::sync::{Mutex, broadcast, mpsc};

use crate::context::AppContext;
use crate::location::{BrowserLocation, NavSignal};
use crate::path::normalize_path;
use crate::routes::{DEFAULT_AUTHENTICATED, LOGIN, Page, RouteTable};
use crate::surface::{RouteState, Surface};
use crate::views::{load_page_model, render_page};
use crate::vm::PageModel;

/// Redirect hops allowed within one resolution.
pub const MAX_REDIRECTS: usize = 4;

/// How a call to [`Router::handle_route`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Rendered { path: String, page: Page },
    Errored { path: String, message: String },
    /// A newer resolution took over the surface before this one finished.
    Superseded,
}

enum Step {
    Done(RouteOutcome),
    Redirect(&'static str),
}

/// Resolves locations to pages and draws them, gating on sign-in and role.
pub struct Router {
    ctx: AppContext,
    table: RouteTable,
    location: BrowserLocation,
    surface: Surface,
    tracker: Mutex<Option<Arc<PageTimeTracker>>>,
}

impl Router {
    #[must_use]
    pub fn new(ctx: AppContext, table: RouteTable, location: BrowserLocation) -> Self {
        Self {
            ctx,
            table,
            location,
            surface: Surface::new(),
            tracker: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    #[must_use]
    pub fn location(&self) -> &BrowserLocation {
        &self.location
    }

    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Tracker of the curriculum page on screen.
    pub async fn active_tracker(&self) -> Option<Arc<PageTimeTracker>> {
        self.tracker.lock().await.clone()
    }

    /// Normalize `path`, record it in history and resolve it.
    pub async fn navigate_to(&self, path: &str) -> RouteOutcome {
        let route = normalize_path(path);
        self.location.push_route(&route);
        self.handle_route(&route).await
    }

    /// Resolve whatever the location currently points at.
    pub async fn handle_current(&self) -> RouteOutcome {
        let source = self.location.route_source();
        self.handle_route(&source).await
    }

    /// Resolve `raw` and render the result. Never fails: errors end on the
    /// error screen and redirects are followed up to [`MAX_REDIRECTS`] hops.
    pub async fn handle_route(&self, raw: &str) -> RouteOutcome {
        let mut path = normalize_path(raw);
        for _ in 0..=MAX_REDIRECTS {
            let generation = self.surface.begin();
            match self.resolve(generation, &path).await {
                Step::Done(outcome) => return outcome,
                Step::Redirect(target) => {
                    if !self.surface.transition(generation, RouteState::Redirecting) {
                        return RouteOutcome::Superseded;
                    }
                    tracing::debug!(from = %path, to = target, "redirecting");
                    self.location.replace_route(target);
                    path = target.to_string();
                }
            }
        }
        let generation = self.surface.begin();
        tracing::error!(%path, "redirect limit reached");
        self.fail(generation, &path, "too many redirects")
    }

    async fn resolve(&self, generation: u64, path: &str) -> Step {
        let (key, entry) = self.table.resolve(path);
        let key = key.to_string();

        self.surface.show(
            generation,
            &key,
            None,
            RouteState::Loading,
            render_page(&PageModel::Loading),
        );
        self.surface.transition(generation, RouteState::AuthCheck);
        let user = match self.ctx.auth().current_user().await {
            Ok(user) => user,
            Err(err) => return Step::Done(self.fail(generation, &key, &err.to_string())),
        };
        if !self.surface.is_current(generation) {
            return Step::Done(RouteOutcome::Superseded);
        }
        if entry.requires_auth && user.is_none() {
            return Step::Redirect(LOGIN);
        }

        self.surface.transition(generation, RouteState::RoleCheck);
        if entry.admin_only && !user.as_ref().is_some_and(User::is_admin) {
            return Step::Redirect(DEFAULT_AUTHENTICATED);
        }

        let model = match load_page_model(&self.ctx, entry.page, path, user.as_ref()).await {
            Ok(model) => model,
            Err(err) => return Step::Done(self.fail(generation, &key, &err.message())),
        };
        if !self.surface.is_current(generation) {
            return Step::Done(RouteOutcome::Superseded);
        }
        self.activate(entry.page).await;

        let html = render_page(&model);
        if self
            .surface
            .show(generation, &key, Some(entry.page), RouteState::Rendered, html)
        {
            tracing::debug!(path = %key, page = %entry.page, "rendered");
            Step::Done(RouteOutcome::Rendered {
                path: key,
                page: entry.page,
            })
        } else {
            Step::Done(RouteOutcome::Superseded)
        }
    }

    fn fail(&self, generation: u64, path: &str, message: &str) -> RouteOutcome {
        tracing::error!(%path, error = message, "route failed");
        let html = render_page(&PageModel::Error {
            message: message.to_string(),
        });
        if self
            .surface
            .show(generation, path, None, RouteState::Errored, html)
        {
            RouteOutcome::Errored {
                path: path.to_string(),
                message: message.to_string(),
            }
        } else {
            RouteOutcome::Superseded
        }
    }

    /// Swap page trackers for the page about to show.
    ///
    /// The active category survives leaving a curriculum page so a pending
    /// auto-save still lands on the category that was edited.
    async fn activate(&self, page: Page) {
        let mut slot = self.tracker.lock().await;
        if let Page::Curriculum(category) = page {
            self.ctx.state().set_current_category(Some(category));
            let same_page = slot
                .as_ref()
                .is_some_and(|t| t.page() == category.slug() && !t.is_torn_down());
            if same_page {
                return;
            }
        }
        if let Some(previous) = slot.take() {
            previous.teardown(TeardownReason::Navigation).await;
        }
        if let Page::Curriculum(category) = page {
            *slot = Some(self.ctx.services().track_page(category).await);
        }
    }

    /// Re-render the page on screen from current state, without a new
    /// resolution. Returns false when another page is showing.
    pub async fn refresh(&self, page: Page) -> bool {
        if self.surface.page() != Some(page) {
            return false;
        }
        let user = self.ctx.state().current_user();
        let path = self.surface.path();
        match load_page_model(&self.ctx, page, &path, user.as_ref()).await {
            Ok(model) => self.surface.repaint(page, render_page(&model)),
            Err(err) => {
                tracing::warn!(%page, error = %err, "refresh failed");
                false
            }
        }
    }

    /// Paint the login page with an inline message.
    pub(crate) fn show_login_message(&self, error: Option<String>, notice: Option<String>) -> bool {
        self.surface
            .repaint(Page::Login, render_page(&PageModel::Login { error, notice }))
    }

    /// Backend session changed outside a direct call.
    pub async fn on_auth_change(&self, change: AuthChange) -> RouteOutcome {
        match change {
            AuthChange::SignedIn(auth_user) => {
                let previous = self.ctx.state().current_user().map(|u| u.id);
                if previous.as_ref() != Some(&auth_user.id) {
                    // A pending save belongs to whoever made the edits.
                    self.ctx.autosave().cancel();
                }
                let user = self.ctx.auth().adopt(auth_user).await;
                tracing::info!(user = %user.id, "session started");
                self.navigate_to(DEFAULT_AUTHENTICATED).await
            }
            AuthChange::SignedOut => {
                self.end_session().await;
                self.navigate_to(LOGIN).await
            }
        }
    }

    /// Drop everything tied to the signed-in user.
    pub(crate) async fn end_session(&self) {
        self.ctx.autosave().cancel();
        self.shutdown(TeardownReason::SignOut).await;
        self.ctx.state().clear();
    }

    /// First resolution after startup. An OAuth redirect landing here is
    /// completed before routing.
    pub async fn bootstrap(&self) -> RouteOutcome {
        let href = self.location.href();
        let params = callback_params(&href);
        if let Some(error) = params
            .get("error_description")
            .or_else(|| params.get("error"))
        {
            tracing::warn!(%error, "oauth provider reported an error");
            return self.login_with_error(error.clone()).await;
        }
        if !params.contains_key("access_token") {
            return self.handle_current().await;
        }

        match self.ctx.auth().complete_oauth(&href).await {
            Ok(Some(user)) => {
                tracing::info!(user = %user.id, "oauth sign-in completed");
                self.location.replace_route(DEFAULT_AUTHENTICATED);
                self.handle_route(DEFAULT_AUTHENTICATED).await
            }
            Ok(None) => self.handle_current().await,
            Err(err) => {
                tracing::warn!(error = %err, "oauth callback rejected");
                self.login_with_error(err.to_string()).await
            }
        }
    }

    async fn login_with_error(&self, message: String) -> RouteOutcome {
        self.location.replace_route(LOGIN);
        let outcome = self.handle_route(LOGIN).await;
        self.show_login_message(Some(message), None);
        outcome
    }

    /// Follow browser signals, auth changes and save acknowledgments until
    /// the location goes away.
    pub async fn run(self: Arc<Self>, mut signals: mpsc::UnboundedReceiver<NavSignal>) {
        let mut auth = self.ctx.auth().subscribe();
        let mut auth_open = true;
        let mut indicator = self.ctx.autosave().subscribe();
        loop {
            tokio::select! {
                signal = signals.recv() => {
                    let Some(signal) = signal else { break };
                    tracing::debug!(?signal, "navigation signal");
                    self.handle_current().await;
                }
                change = auth.recv(), if auth_open => match change {
                    Ok(change) => {
                        self.on_auth_change(change).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed auth changes, re-resolving");
                        self.handle_current().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => auth_open = false,
                },
                Ok(()) = indicator.changed() => {
                    if let Some(page @ (Page::Dashboard | Page::Curriculum(_))) = self.surface.page() {
                        self.refresh(page).await;
                    }
                }
            }
        }
        self.shutdown(TeardownReason::TabClose).await;
    }

    /// Tear down the active page tracker. Safe to call repeatedly.
    pub async fn shutdown(&self, reason: TeardownReason) {
        let tracker = self.tracker.lock().await.take();
        if let Some(tracker) = tracker {
            tracker.teardown(reason).await;
        }
    }
}
