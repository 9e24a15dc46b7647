use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use url::Url;

/// Browser signals that make the router re-read the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSignal {
    /// History back/forward.
    PopState,
    HashChange,
}

/// One history entry: pathname plus fragment without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub hash: String,
}

#[derive(Debug)]
struct History {
    origin: String,
    entries: Vec<Location>,
    index: usize,
}

impl History {
    fn current(&self) -> &Location {
        &self.entries[self.index]
    }

    fn push(&mut self, location: Location) {
        self.entries.truncate(self.index + 1);
        self.entries.push(location);
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, location: Location) {
        self.entries[self.index] = location;
    }
}

/// Window location and session history of one tab.
///
/// Router-initiated pushes are silent like `history.pushState`; moving
/// through history and editing the hash emit a [`NavSignal`].
#[derive(Debug, Clone)]
pub struct BrowserLocation {
    history: Arc<Mutex<History>>,
    signals: mpsc::UnboundedSender<NavSignal>,
}

impl BrowserLocation {
    /// Open a tab at `url`.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `url` is not absolute.
    pub fn new(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<NavSignal>), url::ParseError> {
        let parsed = Url::parse(url)?;
        let entry = Location {
            path: parsed.path().to_string(),
            hash: parsed.fragment().unwrap_or_default().to_string(),
        };
        let history = History {
            origin: parsed.origin().ascii_serialization(),
            entries: vec![entry],
            index: 0,
        };
        let (signals, receiver) = mpsc::unbounded_channel();
        Ok((
            Self {
                history: Arc::new(Mutex::new(history)),
                signals,
            },
            receiver,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, signal: NavSignal) {
        // Nobody listening just means the router is gone.
        let _ = self.signals.send(signal);
    }

    #[must_use]
    pub fn current(&self) -> Location {
        self.lock().current().clone()
    }

    #[must_use]
    pub fn origin(&self) -> String {
        self.lock().origin.clone()
    }

    #[must_use]
    pub fn href(&self) -> String {
        let history = self.lock();
        let current = history.current();
        if current.hash.is_empty() {
            format!("{}{}", history.origin, current.path)
        } else {
            format!("{}{}#{}", history.origin, current.path, current.hash)
        }
    }

    /// Raw route of the current entry: the hash when present, else the pathname.
    #[must_use]
    pub fn route_source(&self) -> String {
        let current = self.current();
        if current.hash.is_empty() {
            current.path
        } else {
            format!("#{}", current.hash)
        }
    }

    /// Hash addressing is active whenever the current entry carries a fragment.
    #[must_use]
    pub fn uses_hash_routing(&self) -> bool {
        !self.lock().current().hash.is_empty()
    }

    /// Record a navigation to an already normalized route.
    pub fn push_route(&self, route: &str) {
        let mut history = self.lock();
        let entry = entry_for(history.current(), route);
        if *history.current() != entry {
            history.push(entry);
        }
    }

    /// Swap the current entry for `route`, as redirects do.
    pub fn replace_route(&self, route: &str) {
        let mut history = self.lock();
        let entry = entry_for(history.current(), route);
        history.replace(entry);
    }

    /// Replace the whole URL of the current entry without a signal.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `url` is not absolute.
    pub fn replace_url(&self, url: &str) -> Result<(), url::ParseError> {
        let parsed = Url::parse(url)?;
        let mut history = self.lock();
        history.origin = parsed.origin().ascii_serialization();
        history.replace(Location {
            path: parsed.path().to_string(),
            hash: parsed.fragment().unwrap_or_default().to_string(),
        });
        Ok(())
    }

    /// The user edited the fragment.
    pub fn set_hash(&self, hash: &str) {
        {
            let mut history = self.lock();
            let path = history.current().path.clone();
            history.push(Location {
                path,
                hash: hash.trim_start_matches('#').to_string(),
            });
        }
        self.emit(NavSignal::HashChange);
    }

    /// Returns false at the start of history.
    pub fn back(&self) -> bool {
        let moved = {
            let mut history = self.lock();
            if history.index == 0 {
                false
            } else {
                history.index -= 1;
                true
            }
        };
        if moved {
            self.emit(NavSignal::PopState);
        }
        moved
    }

    /// Returns false at the end of history.
    pub fn forward(&self) -> bool {
        let moved = {
            let mut history = self.lock();
            if history.index + 1 >= history.entries.len() {
                false
            } else {
                history.index += 1;
                true
            }
        };
        if moved {
            self.emit(NavSignal::PopState);
        }
        moved
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.lock().entries.len()
    }
}

/// Entry reached by navigating from `current` to `route`, keeping the
/// addressing mode of `current`.
fn entry_for(current: &Location, route: &str) -> Location {
    if current.hash.is_empty() {
        return Location {
            path: route.to_string(),
            hash: String::new(),
        };
    }
    // An empty fragment would drop the tab out of hash addressing.
    let hash = match route.trim_start_matches('/') {
        "" => "/".to_string(),
        rest => rest.to_string(),
    };
    Location {
        path: current.path.clone(),
        hash,
    }
}
