use crate::session::SessionStore;
use crate::sync::bus::{BusHandle, SyncBus, SyncMessage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// How often the backend is asked for the latest dashboard versions.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Versions the server may be ahead of us without flagging staleness.
///
/// A lag of one covers the window where this instance's own save has
/// completed on the server but the local cache has not caught up yet.
pub const VERSION_LAG_TOLERANCE: u64 = 1;

/// In-instance belief about whether the displayed dashboard is stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub is_out_of_sync: bool,
    pub last_server_update: Option<DateTime<Utc>>,
    pub conflicting_dashboard_id: Option<String>,
}

/// Backend view of dashboard versions, mockable in tests.
pub trait VersionSource: Send + Sync {
    fn latest_versions(&self) -> anyhow::Result<HashMap<String, u64>>;
}

/// Polling is only armed while a user session exists.
pub trait SessionGate: Send + Sync {
    fn is_active(&self) -> bool;
}

impl SessionGate for SessionStore {
    fn is_active(&self) -> bool {
        SessionStore::is_active(self)
    }
}

/// Identifier returned by [`SyncService::on_sync_status_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

struct Shared {
    tab_id: String,
    poll_interval: Mutex<Duration>,
    versions: Mutex<HashMap<String, u64>>,
    current: Mutex<Option<String>>,
    status: Mutex<SyncStatus>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    source: Arc<dyn VersionSource>,
    session: Arc<dyn SessionGate>,
    destroyed: AtomicBool,
}

impl Shared {
    fn set_status(&self, status: SyncStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status.clone();
        }
        self.notify(&status);
    }

    /// Listeners run synchronously on every status mutation, including
    /// no-op ones. A panicking listener is logged and isolated.
    fn notify(&self, status: &SyncStatus) {
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in listeners {
            if std::panic::catch_unwind(AssertUnwindSafe(|| listener(status))).is_err() {
                tracing::warn!("sync status listener panicked");
            }
        }
    }

    fn on_message(&self, msg: &SyncMessage) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        // Senders see their own broadcasts; ignore them.
        if msg.source_tab_id == self.tab_id {
            return;
        }
        let viewing = self
            .current
            .lock()
            .map(|c| c.as_deref() == Some(msg.dashboard_id.as_str()))
            .unwrap_or(false);
        if !viewing {
            return;
        }
        if let Some(version) = msg.version {
            if let Ok(mut versions) = self.versions.lock() {
                versions.insert(msg.dashboard_id.clone(), version);
            }
        }
        self.set_status(SyncStatus {
            is_out_of_sync: true,
            last_server_update: Some(msg.updated_at),
            conflicting_dashboard_id: Some(msg.dashboard_id.clone()),
        });
    }

    /// One poll tick. Returns whether the backend was actually asked.
    ///
    /// Ticks are suppressed once out of sync, without a session, or when no
    /// dashboard is being viewed. A failed fetch is advisory only: it is
    /// logged at debug level and the next tick proceeds as usual.
    fn poll_tick(&self) -> bool {
        if self.destroyed.load(Ordering::SeqCst) {
            return false;
        }
        if self.status.lock().map(|s| s.is_out_of_sync).unwrap_or(true) {
            return false;
        }
        if !self.session.is_active() {
            return false;
        }
        let current = match self.current.lock() {
            Ok(current) => current.clone(),
            Err(_) => return false,
        };
        let Some(current) = current else {
            return false;
        };
        match self.source.latest_versions() {
            Ok(server) => self.apply_server_versions(&current, server),
            Err(err) => tracing::debug!("dashboard version poll failed: {err}"),
        }
        true
    }

    fn apply_server_versions(&self, current: &str, server: HashMap<String, u64>) {
        let local = self
            .versions
            .lock()
            .ok()
            .and_then(|v| v.get(current).copied());
        if let (Some(&server_version), Some(local)) = (server.get(current), local) {
            if server_version > local + VERSION_LAG_TOLERANCE {
                self.set_status(SyncStatus {
                    is_out_of_sync: true,
                    last_server_update: Some(Utc::now()),
                    conflicting_dashboard_id: Some(current.to_string()),
                });
            }
        }
        if let Ok(mut versions) = self.versions.lock() {
            versions.extend(server);
        }
    }
}

struct Poller {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Poller {
    fn spawn(shared: Arc<Shared>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let interval = shared
            .poll_interval
            .lock()
            .map(|i| *i)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let join = std::thread::spawn(move || {
            const TICK: Duration = Duration::from_millis(50);
            let mut waited = Duration::ZERO;
            while !stop_flag.load(Ordering::SeqCst) {
                std::thread::sleep(TICK);
                waited += TICK;
                if waited >= interval {
                    waited = Duration::ZERO;
                    shared.poll_tick();
                }
            }
        });
        Self {
            stop,
            join: Some(join),
        }
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Detects that the dashboard currently displayed by this instance has been
/// modified elsewhere, via same-process broadcasts and periodic server
/// polls, and surfaces a subscribable stale flag.
///
/// Two states only: in sync and out of sync. Out of sync is terminal for
/// the polling loop until [`mark_in_sync`](Self::mark_in_sync) or a new
/// [`set_current_dashboard`](Self::set_current_dashboard) call.
pub struct SyncService {
    shared: Arc<Shared>,
    bus: Option<Arc<SyncBus>>,
    bus_handle: Mutex<Option<BusHandle>>,
    poller: Mutex<Option<Poller>>,
}

impl SyncService {
    /// Without a bus the service degrades to poll-only detection.
    pub fn new(
        source: Arc<dyn VersionSource>,
        session: Arc<dyn SessionGate>,
        bus: Option<Arc<SyncBus>>,
    ) -> Self {
        let tab_id = format!("{:016x}", rand::random::<u64>());
        let shared = Arc::new(Shared {
            tab_id,
            poll_interval: Mutex::new(DEFAULT_POLL_INTERVAL),
            versions: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            status: Mutex::new(SyncStatus::default()),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
            source,
            session,
            destroyed: AtomicBool::new(false),
        });
        let bus_handle = bus.as_ref().map(|bus| {
            let shared = Arc::clone(&shared);
            bus.attach(move |msg| shared.on_message(msg))
        });
        Self {
            shared,
            bus,
            bus_handle: Mutex::new(bus_handle),
            poller: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(self, interval: Duration) -> Self {
        if let Ok(mut poll_interval) = self.shared.poll_interval.lock() {
            *poll_interval = interval;
        }
        self
    }

    pub fn tab_id(&self) -> &str {
        &self.shared.tab_id
    }

    /// Navigate to a dashboard: state resets to in-sync, the known version
    /// is recorded and the poll timer is (re)armed if a session exists.
    pub fn set_current_dashboard(&self, id: &str, version: Option<u64>) {
        if self.shared.destroyed.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(mut current) = self.shared.current.lock() {
            *current = Some(id.to_string());
        }
        if let Some(version) = version {
            if let Ok(mut versions) = self.shared.versions.lock() {
                versions.insert(id.to_string(), version);
            }
        }
        self.shared.set_status(SyncStatus::default());
        self.restart_polling();
    }

    fn restart_polling(&self) {
        let Ok(mut poller) = self.poller.lock() else {
            return;
        };
        if let Some(mut old) = poller.take() {
            old.stop();
        }
        if self.shared.session.is_active() {
            *poller = Some(Poller::spawn(Arc::clone(&self.shared)));
        }
    }

    pub fn update_dashboard_version(&self, id: &str, version: u64) {
        if let Ok(mut versions) = self.shared.versions.lock() {
            versions.insert(id.to_string(), version);
        }
    }

    pub fn dashboard_version(&self, id: &str) -> Option<u64> {
        self.shared
            .versions
            .lock()
            .ok()
            .and_then(|v| v.get(id).copied())
    }

    /// Publish a save notification tagged with this instance's tab id and
    /// the wall-clock update time; the local version cache follows.
    pub fn broadcast_dashboard_update(&self, id: &str, version: Option<u64>) -> SyncMessage {
        if let Some(version) = version {
            self.update_dashboard_version(id, version);
        }
        let msg = SyncMessage {
            dashboard_id: id.to_string(),
            updated_at: Utc::now(),
            version,
            source_tab_id: self.shared.tab_id.clone(),
        };
        if let Some(bus) = &self.bus {
            bus.publish(&msg);
        }
        msg
    }

    pub fn on_sync_status_change(
        &self,
        listener: impl Fn(&SyncStatus) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.retain(|(lid, _)| *lid != id.0);
        }
    }

    /// Defensive copy of the current status.
    pub fn sync_status(&self) -> SyncStatus {
        self.shared
            .status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Force the in-sync state, typically after the caller reloaded the
    /// dashboard data. Poll ticks resume on their own.
    pub fn mark_in_sync(&self) {
        if self.shared.destroyed.load(Ordering::SeqCst) {
            return;
        }
        self.shared.set_status(SyncStatus::default());
    }

    /// Run a single poll tick immediately. Returns whether the backend was
    /// asked, i.e. false while suppressed.
    pub fn poll_now(&self) -> bool {
        self.shared.poll_tick()
    }

    /// Idempotent teardown: stops polling, detaches from the bus and clears
    /// listeners.
    pub fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut poller) = self.poller.lock() {
            if let Some(mut poller) = poller.take() {
                poller.stop();
            }
        }
        if let (Some(bus), Ok(mut handle)) = (&self.bus, self.bus_handle.lock()) {
            if let Some(handle) = handle.take() {
                bus.detach(handle);
            }
        }
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.clear();
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.destroy();
    }
}
