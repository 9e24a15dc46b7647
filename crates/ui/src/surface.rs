use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::routes::Page;

/// Most recent state changes kept for inspection; older ones are dropped.
pub const TRANSITION_HISTORY: usize = 32;

/// Where a route resolution currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Loading,
    AuthCheck,
    RoleCheck,
    Rendered,
    Redirecting,
    Errored,
}

impl RouteState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RouteState::Rendered | RouteState::Errored)
    }
}

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    path: String,
    page: Option<Page>,
    state: Option<RouteState>,
    html: String,
    transitions: VecDeque<(u64, RouteState)>,
}

impl Inner {
    fn record(&mut self, generation: u64, state: RouteState) {
        if self.transitions.len() == TRANSITION_HISTORY {
            self.transitions.pop_front();
        }
        self.transitions.push_back((generation, state));
    }
}

/// The `#app` mount point the router draws into.
///
/// Every resolution takes a generation from [`Surface::begin`]; writes from
/// an older generation are dropped so a slow resolution never paints over a
/// newer one.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    inner: Arc<Mutex<Inner>>,
}

impl Surface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new resolution, superseding all earlier ones.
    pub fn begin(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.generation
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Record a state change; ignored for stale generations.
    pub fn transition(&self, generation: u64, state: RouteState) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = Some(state);
        inner.record(generation, state);
        true
    }

    /// Replace the visible content; ignored for stale generations.
    pub fn show(
        &self,
        generation: u64,
        path: &str,
        page: Option<Page>,
        state: RouteState,
        html: String,
    ) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(generation, current = inner.generation, path, "dropping stale render");
            return false;
        }
        inner.path = path.to_string();
        inner.page = page;
        inner.state = Some(state);
        inner.html = html;
        inner.record(generation, state);
        true
    }

    /// Repaint the current page in place, as actions do after a mutation.
    pub fn repaint(&self, page: Page, html: String) -> bool {
        let mut inner = self.lock();
        if inner.page != Some(page) {
            return false;
        }
        inner.html = html;
        true
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.lock().html.clone()
    }

    #[must_use]
    pub fn path(&self) -> String {
        self.lock().path.clone()
    }

    #[must_use]
    pub fn page(&self) -> Option<Page> {
        self.lock().page
    }

    #[must_use]
    pub fn state(&self) -> Option<RouteState> {
        self.lock().state
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// The last [`TRANSITION_HISTORY`] states, oldest first, tagged with
    /// their generation.
    #[must_use]
    pub fn transitions(&self) -> Vec<(u64, RouteState)> {
        self.lock().transitions.iter().copied().collect()
    }
}
