use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Channel name kept for parity with the wire format of the backend's
/// update notifications.
pub const CHANNEL_NAME: &str = "dashboard-sync";

/// Message published when a dashboard is saved anywhere in this process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncMessage {
    pub dashboard_id: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: Option<u64>,
    /// Identifier of the publishing instance so senders can ignore their
    /// own messages.
    pub source_tab_id: String,
}

type Handler = Arc<dyn Fn(&SyncMessage) + Send + Sync>;

/// Handle returned by [`SyncBus::attach`]; pass it back to `detach`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusHandle(u64);

/// In-process broadcast hub connecting every sync service instance.
///
/// Delivery is synchronous and in attach order. A panicking handler is
/// logged and does not stop delivery to the rest.
#[derive(Default)]
pub struct SyncBus {
    handlers: Mutex<Vec<(u64, Handler)>>,
    next_id: AtomicU64,
}

impl SyncBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach(&self, handler: impl Fn(&SyncMessage) + Send + Sync + 'static) -> BusHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.push((id, Arc::new(handler)));
        }
        BusHandle(id)
    }

    /// Idempotent; detaching twice is a no-op.
    pub fn detach(&self, handle: BusHandle) {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.retain(|(id, _)| *id != handle.0);
        }
    }

    pub fn publish(&self, message: &SyncMessage) {
        let handlers: Vec<Handler> = match self.handlers.lock() {
            Ok(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            Err(_) => return,
        };
        for handler in handlers {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
                tracing::warn!(channel = CHANNEL_NAME, "sync bus handler panicked");
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().map(|h| h.len()).unwrap_or(0)
    }
}
