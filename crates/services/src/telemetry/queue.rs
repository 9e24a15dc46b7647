use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use hub_core::model::QueuedEvent;
use storage::repository::{EventRow, EventSink, LocalStore};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const QUEUE_STORAGE_KEY: &str = "perf_event_queue_v1";
pub const DEFAULT_FLUSH_THRESHOLD: usize = 12;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Queue length that triggers an immediate flush.
    pub flush_threshold: usize,
    pub flush_interval: Duration,
    pub storage_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            storage_key: QUEUE_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Empty,
    Sent(usize),
    /// The batch was rejected and put back at the head of the queue.
    Requeued(usize),
}

/// Events waiting for a flush plus the batches currently with the sink.
#[derive(Default)]
struct Buffer {
    pending: Vec<QueuedEvent>,
    in_flight: BTreeMap<u64, Vec<QueuedEvent>>,
    next_batch: u64,
}

impl Buffer {
    /// Everything not yet confirmed by the sink, oldest batch first.
    fn unconfirmed(&self) -> Vec<QueuedEvent> {
        self.in_flight
            .values()
            .flatten()
            .chain(&self.pending)
            .cloned()
            .collect()
    }
}

/// Ordered buffer of usage events mirrored to local storage.
///
/// Delivery is at least once: events leave local storage only after the
/// sink accepted the batch that carried them.
pub struct EventQueue {
    sink: Arc<dyn EventSink>,
    local: Arc<dyn LocalStore>,
    config: QueueConfig,
    buffer: Mutex<Buffer>,
}

impl EventQueue {
    /// Build a queue, restoring events persisted by a previous run.
    ///
    /// Unreadable persisted data is logged and discarded.
    pub async fn restore(
        sink: Arc<dyn EventSink>,
        local: Arc<dyn LocalStore>,
        config: QueueConfig,
    ) -> Arc<Self> {
        let events = match local.get(&config.storage_key).await {
            Ok(Some(raw)) => serde_json::from_str::<Vec<QueuedEvent>>(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "discarding unreadable event queue");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "event queue could not be read");
                Vec::new()
            }
        };
        if !events.is_empty() {
            tracing::info!(count = events.len(), "restored queued events");
        }
        Arc::new(Self {
            sink,
            local,
            config,
            buffer: Mutex::new(Buffer {
                pending: events,
                ..Buffer::default()
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Events waiting for the next flush. Batches already handed to the
    /// sink are not counted.
    pub async fn len(&self) -> usize {
        self.buffer.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buffer.lock().await.pending.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<QueuedEvent> {
        self.buffer.lock().await.pending.clone()
    }

    async fn persist(&self, buffer: &Buffer) {
        let raw = match serde_json::to_string(&buffer.unconfirmed()) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "event queue could not be serialized");
                return;
            }
        };
        if let Err(err) = self.local.set(&self.config.storage_key, &raw).await {
            tracing::warn!(error = %err, "event queue could not be persisted");
        }
    }

    /// Append and persist an event. Reaching the threshold starts a
    /// background flush.
    pub async fn enqueue(self: &Arc<Self>, event: QueuedEvent) {
        let len = {
            let mut buffer = self.buffer.lock().await;
            buffer.pending.push(event);
            self.persist(&buffer).await;
            buffer.pending.len()
        };
        if len >= self.config.flush_threshold {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.flush().await;
            });
        }
    }

    /// Send everything queued so far in one batch.
    ///
    /// Events enqueued while the request is in flight are not part of it.
    /// The persisted copy keeps the batch until the sink accepts it, so a
    /// run that dies mid-request restores it. On failure the batch goes
    /// back in front of the newer events in its original order.
    pub async fn flush(&self) -> FlushOutcome {
        let (id, batch) = {
            let mut buffer = self.buffer.lock().await;
            if buffer.pending.is_empty() {
                return FlushOutcome::Empty;
            }
            let batch = std::mem::take(&mut buffer.pending);
            let id = buffer.next_batch;
            buffer.next_batch += 1;
            buffer.in_flight.insert(id, batch.clone());
            (id, batch)
        };

        let rows: Vec<EventRow> = batch.iter().map(EventRow::from).collect();
        let result = self.sink.insert_events(&rows).await;

        let mut buffer = self.buffer.lock().await;
        buffer.in_flight.remove(&id);
        let count = batch.len();
        let outcome = match result {
            Ok(()) => {
                tracing::debug!(count, "event batch sent");
                FlushOutcome::Sent(count)
            }
            Err(err) => {
                tracing::error!(error = %err, count, "event batch failed, requeued");
                let newer = std::mem::replace(&mut buffer.pending, batch);
                buffer.pending.extend(newer);
                FlushOutcome::Requeued(count)
            }
        };
        self.persist(&buffer).await;
        outcome
    }

    /// Flush on a fixed interval until the returned task is aborted.
    pub fn start_periodic_flush(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let period = self.config.flush_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                this.flush().await;
            }
        })
    }

    /// Connectivity signal from the host; regaining it triggers a flush.
    pub async fn on_connectivity_change(&self, online: bool) -> FlushOutcome {
        if online {
            self.flush().await
        } else {
            FlushOutcome::Empty
        }
    }
}
