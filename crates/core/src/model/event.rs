use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::ids::{SessionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Enter,
    Exit,
    Complete,
    ActivityLog,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Enter => "enter",
            EventType::Exit => "exit",
            EventType::Complete => "complete",
            EventType::ActivityLog => "activity_log",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A usage event waiting in the local queue.
///
/// This is also the shape persisted to local storage, so field names are
/// stable across releases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEvent {
    #[serde(rename = "userId")]
    pub user_id: Option<UserId>,
    pub page: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub props: Map<String, Value>,
    pub ts: DateTime<Utc>,
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}

impl QueuedEvent {
    #[must_use]
    pub fn new(
        user_id: Option<UserId>,
        page: impl Into<String>,
        event_type: EventType,
        session_id: SessionId,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            page: page.into(),
            event_type,
            props: Map::new(),
            ts,
            session_id,
        }
    }

    #[must_use]
    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }
}
