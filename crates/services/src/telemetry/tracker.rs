use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hub_core::Clock;
use hub_core::model::{EventType, QueuedEvent, SessionId, UserId};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::queue::EventQueue;

/// Why a tracked page went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Navigation,
    TabClose,
    PageHide,
    SignOut,
}

impl TeardownReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TeardownReason::Navigation => "navigation",
            TeardownReason::TabClose => "beforeunload",
            TeardownReason::PageHide => "pagehide",
            TeardownReason::SignOut => "sign_out",
        }
    }
}

struct Visibility {
    visible_since: Option<Instant>,
    accumulated_secs: u64,
    torn_down: bool,
}

/// Measures visible time on one page and reports it through the event queue.
pub struct PageTimeTracker {
    queue: Arc<EventQueue>,
    clock: Clock,
    page: String,
    user_id: Option<UserId>,
    session_id: SessionId,
    state: Mutex<Visibility>,
    periodic: Mutex<Option<JoinHandle<()>>>,
}

fn rounded_secs(since: Instant) -> u64 {
    let millis = since.elapsed().as_millis();
    u64::try_from((millis + 500) / 1000).unwrap_or(u64::MAX)
}

impl PageTimeTracker {
    /// Record an `enter` event and start the periodic background flush.
    pub async fn start(
        queue: Arc<EventQueue>,
        clock: Clock,
        page: impl Into<String>,
        user_id: Option<UserId>,
    ) -> Arc<Self> {
        let periodic = queue.start_periodic_flush();
        let tracker = Arc::new(Self {
            queue,
            clock,
            page: page.into(),
            user_id,
            session_id: SessionId::random(),
            state: Mutex::new(Visibility {
                visible_since: Some(Instant::now()),
                accumulated_secs: 0,
                torn_down: false,
            }),
            periodic: Mutex::new(Some(periodic)),
        });
        tracing::debug!(page = %tracker.page, session = %tracker.session_id, "page tracking started");
        tracker.record(EventType::Enter, &[]).await;
        tracker
    }

    fn lock_state(&self) -> MutexGuard<'_, Visibility> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn page(&self) -> &str {
        &self.page
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Visibility signal from the host. Hidden time is not counted.
    pub fn set_visible(&self, visible: bool) {
        let mut state = self.lock_state();
        if state.torn_down {
            return;
        }
        match (visible, state.visible_since) {
            (false, Some(since)) => {
                state.accumulated_secs += rounded_secs(since);
                state.visible_since = None;
            }
            (true, None) => state.visible_since = Some(Instant::now()),
            _ => {}
        }
    }

    /// Visible seconds so far, each visible segment rounded on its own.
    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        let state = self.lock_state();
        state.accumulated_secs + state.visible_since.map_or(0, rounded_secs)
    }

    async fn record(&self, event_type: EventType, props: &[(&str, serde_json::Value)]) {
        let mut event = QueuedEvent::new(
            self.user_id.clone(),
            self.page.clone(),
            event_type,
            self.session_id,
            self.clock.now(),
        )
        .with_prop("sessionId", self.session_id.to_string());
        for (key, value) in props {
            event = event.with_prop(key, value.clone());
        }
        self.queue.enqueue(event).await;
    }

    /// Explicit completion of the page: a `complete` event, flushed at once.
    pub async fn mark_complete(&self) {
        self.record(EventType::Complete, &[]).await;
        self.queue.flush().await;
    }

    /// Report the visible time and stop tracking.
    ///
    /// Only the first call has an effect, so tab-close and page-hide firing
    /// back to back still produce a single `activity_log`/`exit` pair.
    /// Returns whether this call performed the teardown.
    pub async fn teardown(&self, reason: TeardownReason) -> bool {
        let duration = {
            let mut state = self.lock_state();
            if state.torn_down {
                return false;
            }
            if let Some(since) = state.visible_since.take() {
                state.accumulated_secs += rounded_secs(since);
            }
            state.torn_down = true;
            state.accumulated_secs
        };
        if let Some(task) = self
            .periodic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }

        let props = [
            ("duration_seconds", serde_json::Value::from(duration)),
            ("reason", serde_json::Value::from(reason.as_str())),
        ];
        self.record(EventType::ActivityLog, &props).await;
        self.record(EventType::Exit, &props).await;
        self.queue.flush().await;
        tracing::debug!(page = %self.page, duration, reason = reason.as_str(), "page tracking stopped");
        true
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.lock_state().torn_down
    }
}

impl Drop for PageTimeTracker {
    fn drop(&mut self) {
        if let Some(task) = self
            .periodic
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}
