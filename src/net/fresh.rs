use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle of a background fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Idle,
    Pending,
    Ready(T),
    Failed(String),
}

/// Ticket identifying one issued request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    seq: Arc<AtomicU64>,
    id: u64,
}

impl RequestTicket {
    pub fn is_current(&self) -> bool {
        self.seq.load(Ordering::SeqCst) == self.id
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Holder for the result of the most recently issued request.
///
/// Every `begin` bumps a per-cell sequence number; a completion is only
/// stored while its ticket is still the latest issued, so a slow response
/// can never overwrite a newer one.
pub struct FreshCell<T> {
    seq: Arc<AtomicU64>,
    state: Arc<Mutex<FetchState<T>>>,
}

impl<T> Clone for FreshCell<T> {
    fn clone(&self) -> Self {
        Self {
            seq: Arc::clone(&self.seq),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for FreshCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FreshCell<T> {
    pub fn new() -> Self {
        Self {
            seq: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(FetchState::Idle)),
        }
    }

    /// Issue a new request, superseding any still in flight.
    pub fn begin(&self) -> RequestTicket {
        let id = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut state) = self.state.lock() {
            *state = FetchState::Pending;
        }
        RequestTicket {
            seq: Arc::clone(&self.seq),
            id,
        }
    }

    /// Store a completion. Returns false when the ticket was superseded and
    /// the result dropped.
    pub fn fulfill(&self, ticket: &RequestTicket, result: Result<T, String>) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        // Check under the lock so a concurrent begin() cannot race the store.
        if self.seq.load(Ordering::SeqCst) != ticket.id {
            tracing::debug!(request = ticket.id, "dropping superseded response");
            return false;
        }
        *state = match result {
            Ok(value) => FetchState::Ready(value),
            Err(err) => FetchState::Failed(err),
        };
        true
    }

    pub fn reset(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut state) = self.state.lock() {
            *state = FetchState::Idle;
        }
    }
}

impl<T: Send + 'static> FreshCell<T> {
    /// Run `fetch` on a background thread; the result lands in the cell
    /// unless a newer request was issued meanwhile.
    pub fn spawn(&self, fetch: impl FnOnce() -> Result<T, String> + Send + 'static) {
        let ticket = self.begin();
        let cell = self.clone();
        std::thread::spawn(move || {
            let result = fetch();
            cell.fulfill(&ticket, result);
        });
    }
}

impl<T: Clone> FreshCell<T> {
    pub fn state(&self) -> FetchState<T> {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or(FetchState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_request_wins_regardless_of_completion_order() {
        let cell = FreshCell::new();
        let first = cell.begin();
        let second = cell.begin();
        assert!(cell.fulfill(&second, Ok(2u32)));
        assert!(!cell.fulfill(&first, Ok(1u32)));
        assert_eq!(cell.state(), FetchState::Ready(2));
    }

    #[test]
    fn failure_is_stored_for_the_current_request() {
        let cell: FreshCell<u32> = FreshCell::new();
        let ticket = cell.begin();
        assert!(cell.fulfill(&ticket, Err("boom".into())));
        assert_eq!(cell.state(), FetchState::Failed("boom".into()));
    }
}
