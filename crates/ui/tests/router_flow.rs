use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hub_core::model::{Category, EventType, ProgressRecord, UserId};
use hub_core::time::fixed_clock;
use services::{AppServices, BackendConfig, ExportFormat, HubConfig, SaveIndicator};
use services::progress_service::row_from_record;
use storage::repository::{
    AuthBackend, AuthChange, AuthSession, AuthUser, Backend, ProgressRepository, ProgressRow,
    StorageError,
};
use storage::{InMemoryBackend, InMemoryLocalStore};
use tokio::sync::{Notify, broadcast};
use ui::{AppContext, BrowserLocation, Page, RouteOutcome, RouteState, RouteTable, Router};

const ORIGIN: &str = "https://hub.example.com";

fn config() -> HubConfig {
    HubConfig::new(BackendConfig::new("memory://backend", "anon"))
}

struct Harness {
    router: Arc<Router>,
    backend: InMemoryBackend,
    signals: tokio::sync::mpsc::UnboundedReceiver<ui::NavSignal>,
}

async fn harness_at(url: &str) -> Harness {
    let backend = InMemoryBackend::new();
    let services =
        AppServices::in_memory(&config(), &backend, &InMemoryLocalStore::new(), fixed_clock()).await;
    let (location, signals) = BrowserLocation::new(url).unwrap();
    let router = Arc::new(Router::new(
        AppContext::new(services),
        RouteTable::standard(),
        location,
    ));
    Harness {
        router,
        backend,
        signals,
    }
}

async fn harness() -> Harness {
    harness_at(&format!("{ORIGIN}/")).await
}

fn rendered(path: &str, page: Page) -> RouteOutcome {
    RouteOutcome::Rendered {
        path: path.to_string(),
        page,
    }
}

#[tokio::test]
async fn protected_route_without_user_renders_login() {
    let h = harness().await;

    let outcome = h.router.navigate_to("/dashboard").await;

    assert_eq!(outcome, rendered("/login", Page::Login));
    assert_eq!(h.router.location().route_source(), "/login");
    let states: Vec<RouteState> = h.router.surface().transitions().iter().map(|(_, s)| *s).collect();
    assert!(states.contains(&RouteState::Redirecting));
    assert!(!states.is_empty());
    let html = h.router.surface().html();
    assert!(html.contains("Continue with Google"), "missing login page in {html}");
    assert!(!html.contains("Welcome"), "protected page leaked in {html}");
}

#[tokio::test]
async fn every_protected_route_requires_sign_in() {
    let h = harness().await;
    for path in ["/dashboard", "/admin", "/n8n", "#/vibe-coding", "/ai-tools/"] {
        let outcome = h.router.handle_route(path).await;
        assert_eq!(outcome, rendered("/login", Page::Login), "path {path}");
    }
}

#[tokio::test]
async fn admin_route_redirects_non_admin_to_dashboard() {
    let h = harness().await;
    h.backend.register("intern@example.com", "pw", "intern").unwrap();
    h.router.sign_in("intern@example.com", "pw").await.unwrap();

    let outcome = h.router.navigate_to("#/admin").await;

    assert_eq!(outcome, rendered("/dashboard", Page::Dashboard));
    let html = h.router.surface().html();
    assert!(html.contains("Welcome, intern@example.com"), "missing dashboard in {html}");
}

#[tokio::test]
async fn admin_sees_intern_overview() {
    let h = harness().await;
    h.backend.register("boss@example.com", "pw", "admin").unwrap();
    h.backend.register("intern@example.com", "pw", "intern").unwrap();
    h.router.sign_in("boss@example.com", "pw").await.unwrap();

    let outcome = h.router.navigate_to("/admin").await;

    assert_eq!(outcome, rendered("/admin", Page::Admin));
    let html = h.router.surface().html();
    assert!(html.contains("intern@example.com"), "missing intern row in {html}");
    assert!(!html.contains("boss@example.com</td>"), "admin listed as intern in {html}");
}

#[tokio::test]
async fn unknown_route_renders_not_found() {
    let h = harness().await;
    let outcome = h.router.navigate_to("/does/not/exist").await;
    assert_eq!(outcome, rendered("/404", Page::NotFound));
    assert!(h.router.surface().html().contains("/does/not/exist"));
}

#[tokio::test]
async fn bad_credentials_show_inline_error() {
    let h = harness().await;
    h.router.navigate_to("/login").await;

    let err = h.router.sign_in("nobody@example.com", "nope").await.unwrap_err();

    assert!(matches!(err, ui::ActionError::Auth(_)));
    let html = h.router.surface().html();
    assert!(html.contains("Invalid login credentials"), "missing error in {html}");
    assert_eq!(h.router.surface().page(), Some(Page::Login));
}

#[tokio::test(start_paused = true)]
async fn curriculum_edits_collapse_into_one_save() {
    let h = harness().await;
    let user = h.backend.register("intern@example.com", "pw", "intern").unwrap();
    h.router.sign_in("intern@example.com", "pw").await.unwrap();
    let outcome = h.router.navigate_to("/n8n").await;
    assert_eq!(outcome, rendered("/n8n", Page::Curriculum(Category::N8n)));

    assert!(h.router.toggle_day(2).await.unwrap());
    tokio::time::sleep(Duration::from_millis(300)).await;
    h.router.toggle_day(5).await.unwrap();
    h.router.update_note(5, "webhook flow works").await.unwrap();
    assert!(h.router.surface().html().contains("Progress: 22%"));
    assert_eq!(h.backend.progress_writes(), 0);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(h.backend.progress_writes(), 1);
    assert_eq!(
        h.router.context().autosave().indicator(),
        SaveIndicator::Saved
    );
    let stored = h.backend.stored_progress(&user.id, Category::N8n).unwrap();
    assert_eq!(stored.progress_percent, 22);
    assert_eq!(stored.task_notes.get(&5).map(String::as_str), Some("webhook flow works"));

    let export = h.router.export(ExportFormat::Csv).unwrap();
    assert!(export.body.contains("Progress: 22%"));

    h.router.mark_page_complete().await.unwrap();
    h.router.navigate_to("/dashboard").await;
    let kinds: Vec<EventType> = h.backend.events().iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::Enter,
            EventType::Complete,
            EventType::ActivityLog,
            EventType::Exit
        ]
    );
    assert!(h.router.active_tracker().await.is_none());
    assert_eq!(
        h.router.context().state().current_category(),
        Some(Category::N8n)
    );
}

#[tokio::test]
async fn edits_outside_curriculum_are_rejected() {
    let h = harness().await;
    let err = h.router.toggle_day(0).await.unwrap_err();
    assert!(matches!(err, ui::ActionError::NoActiveCategory));
    assert!(h.router.mark_page_complete().await.is_err());
}

#[tokio::test]
async fn sign_out_clears_session_and_returns_to_login() {
    let h = harness().await;
    h.backend.register("intern@example.com", "pw", "intern").unwrap();
    h.router.sign_in("intern@example.com", "pw").await.unwrap();
    h.router.navigate_to("/vibe-coding").await;
    assert!(h.router.active_tracker().await.is_some());

    let outcome = h.router.sign_out().await;

    assert_eq!(outcome, rendered("/login", Page::Login));
    let state = h.router.context().state();
    assert!(state.current_user().is_none());
    assert!(state.current_category().is_none());
    assert!(h.router.active_tracker().await.is_none());
    let exit = h
        .backend
        .events()
        .into_iter()
        .find(|e| e.event_type == EventType::Exit)
        .unwrap();
    assert_eq!(exit.event_props["reason"], "sign_out");
}

#[tokio::test]
async fn oauth_redirect_completes_before_routing() {
    let h = harness().await;
    h.backend.register("g@example.com", "unused", "intern").unwrap();
    let callback = h.backend.oauth_callback_for("g@example.com", ORIGIN).unwrap();
    h.router.location().replace_url(&callback).unwrap();

    let outcome = h.router.bootstrap().await;

    assert_eq!(outcome, rendered("/dashboard", Page::Dashboard));
    assert_eq!(h.router.location().href(), format!("{ORIGIN}/#dashboard"));
    assert_eq!(
        h.router.context().state().current_user().unwrap().email,
        "g@example.com"
    );
}

#[tokio::test]
async fn rejected_oauth_token_lands_on_login_with_message() {
    let h = harness_at(&format!("{ORIGIN}/#access_token=forged&token_type=bearer")).await;

    let outcome = h.router.bootstrap().await;

    assert_eq!(outcome, rendered("/login", Page::Login));
    let html = h.router.surface().html();
    assert!(html.contains("unknown access token"), "missing oauth error in {html}");
}

#[tokio::test]
async fn provider_error_lands_on_login_with_message() {
    let h = harness_at(&format!(
        "{ORIGIN}/#error=access_denied&error_description=User+cancelled"
    ))
    .await;

    let outcome = h.router.bootstrap().await;

    assert_eq!(outcome, rendered("/login", Page::Login));
    assert!(h.router.surface().html().contains("User cancelled"));
}

#[tokio::test(start_paused = true)]
async fn run_loop_follows_history_and_auth_changes() {
    let h = harness_at(&format!("{ORIGIN}/#/")).await;
    h.backend.register("intern@example.com", "pw", "intern").unwrap();
    let router = Arc::clone(&h.router);
    let task = tokio::spawn(Arc::clone(&router).run(h.signals));
    tokio::time::sleep(Duration::from_millis(1)).await;

    router.handle_current().await;
    assert_eq!(router.surface().page(), Some(Page::Landing));

    // Sign-in pushed by the backend, as after an OAuth popup.
    router
        .context()
        .auth()
        .sign_in("intern@example.com", "pw")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(router.surface().page(), Some(Page::Dashboard));
    assert_eq!(router.location().route_source(), "#dashboard");

    assert!(router.location().back());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(router.surface().page(), Some(Page::Landing));

    router.location().set_hash("#/prompt-engineering");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        router.surface().page(),
        Some(Page::Curriculum(Category::PromptEngineering))
    );

    router.context().auth().sign_out().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(router.surface().page(), Some(Page::Login));
    assert!(router.active_tracker().await.is_none());

    task.abort();
}

/// Auth backend whose first `get_user` call waits for a release signal.
struct GatedAuth {
    inner: InMemoryBackend,
    release: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AuthBackend for GatedAuth {
    async fn get_session(&self) -> Result<Option<AuthSession>, StorageError> {
        self.inner.get_session().await
    }

    async fn get_user(&self) -> Result<Option<AuthUser>, StorageError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.release.notified().await;
        }
        self.inner.get_user().await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StorageError> {
        self.inner.sign_in_with_password(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<Option<AuthSession>, StorageError> {
        self.inner.sign_up(email, password, redirect_to).await
    }

    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<String, StorageError> {
        self.inner.sign_in_with_oauth(provider, redirect_to).await
    }

    async fn complete_oauth_redirect(
        &self,
        callback_url: &str,
    ) -> Result<Option<AuthSession>, StorageError> {
        self.inner.complete_oauth_redirect(callback_url).await
    }

    async fn sign_out(&self) -> Result<(), StorageError> {
        self.inner.sign_out().await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.inner.subscribe()
    }
}

#[tokio::test]
async fn stale_resolution_does_not_clobber_newer_render() {
    let memory = InMemoryBackend::new();
    memory.register("intern@example.com", "pw", "intern").unwrap();
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = Backend {
        auth: Arc::new(GatedAuth {
            inner: memory.clone(),
            release: Arc::clone(&release),
            calls: Arc::clone(&calls),
        }),
        ..Backend::from_memory(&memory)
    };
    let services = AppServices::new(
        &config(),
        backend,
        Arc::new(InMemoryLocalStore::new()),
        fixed_clock(),
    )
    .await;
    let (location, _signals) = BrowserLocation::new(&format!("{ORIGIN}/")).unwrap();
    let router = Arc::new(Router::new(
        AppContext::new(services),
        RouteTable::standard(),
        location,
    ));
    router
        .context()
        .auth()
        .sign_in("intern@example.com", "pw")
        .await
        .unwrap();

    let slow = tokio::spawn({
        let router = Arc::clone(&router);
        async move { router.handle_route("/n8n").await }
    });
    while calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    let fast = router.handle_route("/dashboard").await;
    assert_eq!(fast, rendered("/dashboard", Page::Dashboard));

    release.notify_one();
    assert_eq!(slow.await.unwrap(), RouteOutcome::Superseded);
    assert_eq!(router.surface().page(), Some(Page::Dashboard));
    assert!(router.surface().html().contains("Welcome"));
    assert!(router.active_tracker().await.is_none());
}

async fn router_over(backend: Backend) -> Router {
    let services = AppServices::new(
        &config(),
        backend,
        Arc::new(InMemoryLocalStore::new()),
        fixed_clock(),
    )
    .await;
    let (location, _signals) = BrowserLocation::new(&format!("{ORIGIN}/")).unwrap();
    Router::new(AppContext::new(services), RouteTable::standard(), location)
}

/// Auth backend that cannot be reached.
struct OfflineAuth {
    inner: InMemoryBackend,
}

#[async_trait]
impl AuthBackend for OfflineAuth {
    async fn get_session(&self) -> Result<Option<AuthSession>, StorageError> {
        Err(StorageError::Connection("auth service offline".into()))
    }

    async fn get_user(&self) -> Result<Option<AuthUser>, StorageError> {
        Err(StorageError::Connection("auth service offline".into()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StorageError> {
        self.inner.sign_in_with_password(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<Option<AuthSession>, StorageError> {
        self.inner.sign_up(email, password, redirect_to).await
    }

    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<String, StorageError> {
        self.inner.sign_in_with_oauth(provider, redirect_to).await
    }

    async fn complete_oauth_redirect(
        &self,
        callback_url: &str,
    ) -> Result<Option<AuthSession>, StorageError> {
        self.inner.complete_oauth_redirect(callback_url).await
    }

    async fn sign_out(&self) -> Result<(), StorageError> {
        self.inner.sign_out().await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.inner.subscribe()
    }
}

/// Progress table that rejects reads.
struct BrokenProgress {
    inner: InMemoryBackend,
}

#[async_trait]
impl ProgressRepository for BrokenProgress {
    async fn upsert_progress(&self, row: &ProgressRow) -> Result<ProgressRow, StorageError> {
        self.inner.upsert_progress(row).await
    }

    async fn select_progress(
        &self,
        _intern_id: &UserId,
        _category: Category,
    ) -> Result<Option<ProgressRow>, StorageError> {
        Err(StorageError::Rejected {
            status: 503,
            message: "progress table unavailable".into(),
        })
    }
}

#[tokio::test]
async fn unreachable_auth_renders_error_screen() {
    let memory = InMemoryBackend::new();
    let router = router_over(Backend {
        auth: Arc::new(OfflineAuth {
            inner: memory.clone(),
        }),
        ..Backend::from_memory(&memory)
    })
    .await;

    let outcome = router.navigate_to("/dashboard").await;

    let RouteOutcome::Errored { path, message } = outcome else {
        panic!("expected error screen, got {outcome:?}");
    };
    assert_eq!(path, "/dashboard");
    assert!(message.contains("auth service offline"), "{message}");
    assert_eq!(router.surface().state(), Some(RouteState::Errored));
    let html = router.surface().html();
    assert!(html.contains("Something went wrong"), "missing error screen in {html}");
    assert!(html.contains("auth service offline"), "missing message in {html}");
}

#[tokio::test]
async fn failed_progress_load_renders_error_screen() {
    let memory = InMemoryBackend::new();
    memory.register("intern@example.com", "pw", "intern").unwrap();
    let router = router_over(Backend {
        progress: Arc::new(BrokenProgress {
            inner: memory.clone(),
        }),
        ..Backend::from_memory(&memory)
    })
    .await;
    router
        .context()
        .auth()
        .sign_in("intern@example.com", "pw")
        .await
        .unwrap();

    let outcome = router.navigate_to("#/n8n").await;

    let RouteOutcome::Errored { path, message } = outcome else {
        panic!("expected error screen, got {outcome:?}");
    };
    assert_eq!(path, "/n8n");
    assert!(message.contains("progress table unavailable"), "{message}");
    let html = router.surface().html();
    assert!(html.contains("could not load progress"), "missing message in {html}");
    assert!(router.active_tracker().await.is_none());
    let states: Vec<RouteState> = router.surface().transitions().iter().map(|(_, s)| *s).collect();
    assert_eq!(states.last(), Some(&RouteState::Errored));
    assert!(!states.contains(&RouteState::Rendered));
}

#[tokio::test(start_paused = true)]
async fn new_identity_drops_previous_users_pending_save() {
    let h = harness().await;
    let first = h.backend.register("first@example.com", "pw", "intern").unwrap();
    let second = h.backend.register("second@example.com", "pw", "intern").unwrap();
    let mut seeded = ProgressRecord::new(Category::N8n);
    for day in 0..4 {
        seeded.set_day(day, true).unwrap();
    }
    let owner = hub_core::model::User::new(second.id.clone(), "second@example.com");
    h.backend
        .upsert_progress(&row_from_record(&owner, &seeded))
        .await
        .unwrap();

    h.router.sign_in("first@example.com", "pw").await.unwrap();
    h.router.navigate_to("/n8n").await;
    h.router.toggle_day(8).await.unwrap();
    assert!(h.router.context().autosave().has_pending());

    h.router.on_auth_change(AuthChange::SignedIn(second.clone())).await;
    assert!(!h.router.context().autosave().has_pending());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    let stored = h.backend.stored_progress(&second.id, Category::N8n).unwrap();
    assert_eq!(stored.completed_tasks.iter().filter(|done| **done).count(), 4);
    assert!(h.backend.stored_progress(&first.id, Category::N8n).is_none());
}
