use crate::dashboard::config::SlotConfig;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Notifications exchanged between widgets and the dashboard container.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    /// A widget's settings payload changed.
    WidgetContent { id: String, content: Value },
    /// A slot was replaced wholesale.
    WidgetReplaced { slot: SlotConfig },
    WidgetRemoved { id: String },
    WidgetCopied { id: String },
    /// The dashboard config was reloaded from disk.
    Reloaded,
}

type Listener = Arc<dyn Fn(&DashboardEvent) + Send + Sync>;

/// Identifier returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Synchronous observer bus with typed payloads.
///
/// Listeners run in subscription order. A panicking listener is logged and
/// isolated; later listeners still observe the event.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&DashboardEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        SubscriptionId(id)
    }

    /// Idempotent; unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(lid, _)| *lid != id.0);
        }
    }

    pub fn publish(&self, event: &DashboardEvent) {
        // Snapshot outside the lock so listeners may re-enter the bus.
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in listeners {
            if std::panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::warn!("dashboard event listener panicked");
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}
