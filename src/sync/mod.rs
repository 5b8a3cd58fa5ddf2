pub mod bus;
pub mod service;

pub use bus::{BusHandle, SyncBus, SyncMessage};
pub use service::{
    SessionGate, SubscriptionId, SyncService, SyncStatus, VersionSource, DEFAULT_POLL_INTERVAL,
    VERSION_LAG_TOLERANCE,
};
