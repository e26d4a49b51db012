//! Listener registration and synchronous event fan-out.
//!
//! # Design
//! - Listeners live in a copy-on-write list; dispatch iterates a snapshot, so
//!   registrations made while an event is being delivered never disturb it.
//! - Every entry carries a liveness flag read right before delivery. A listener
//!   removed mid-dispatch receives nothing after its removal.
//! - Listener failures, including panics, stay inside dispatch and are logged.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, warn};

use crate::payloads::EngineEvent;

/// Observer of session events.
///
/// Implementations run synchronously on the thread that dispatches the event
/// and must not block on session work.
pub trait EngineListener: Send + Sync {
    /// Handle one event. Returned errors are logged and never propagate.
    ///
    /// # Errors
    ///
    /// Implementations may return any error; dispatch records it and moves on.
    fn on_event(&self, event: &EngineEvent) -> anyhow::Result<()>;
}

impl<F> EngineListener for F
where
    F: Fn(&EngineEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &EngineEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Handle returned by [`ListenerRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw numeric value, useful in logs.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Counts gathered while dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Listeners that handled the event successfully.
    pub delivered: usize,
    /// Listeners that returned an error or panicked.
    pub failed: usize,
}

#[derive(Clone)]
struct Entry {
    id: ListenerId,
    listener: Arc<dyn EngineListener>,
    active: Arc<AtomicBool>,
}

#[derive(Default)]
pub(crate) struct RegistryInner {
    entries: Mutex<Arc<Vec<Entry>>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    pub(crate) fn reserve_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(&self, id: ListenerId, listener: Arc<dyn EngineListener>) {
        let entry = Entry {
            id,
            listener,
            active: Arc::new(AtomicBool::new(true)),
        };
        let mut entries = self.lock_entries();
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.extend(entries.iter().cloned());
        next.push(entry);
        *entries = Arc::new(next);
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.lock_entries();
        let Some(position) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        entries[position].active.store(false, Ordering::Release);
        let next = entries
            .iter()
            .filter(|entry| entry.id != id)
            .cloned()
            .collect::<Vec<_>>();
        *entries = Arc::new(next);
        true
    }

    fn snapshot(&self) -> Arc<Vec<Entry>> {
        Arc::clone(&*self.lock_entries())
    }

    fn lock_entries(&self) -> MutexGuard<'_, Arc<Vec<Entry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of engine listeners owned by a session.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    pub(crate) inner: Arc<RegistryInner>,
}

impl ListenerRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it receives every event dispatched after this call.
    pub fn add(&self, listener: Arc<dyn EngineListener>) -> ListenerId {
        let id = self.inner.reserve_id();
        self.inner.insert(id, listener);
        id
    }

    /// Unregister a listener. Returns `false` when the id was unknown.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.inner.remove(id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.snapshot().len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every live listener in registration order.
    pub fn dispatch(&self, event: &EngineEvent) -> DispatchOutcome {
        let snapshot = self.inner.snapshot();
        let mut outcome = DispatchOutcome::default();
        for entry in snapshot.iter() {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            let result = panic::catch_unwind(AssertUnwindSafe(|| entry.listener.on_event(event)));
            match result {
                Ok(Ok(())) => outcome.delivered += 1,
                Ok(Err(err)) => {
                    outcome.failed += 1;
                    warn!(
                        event = event.kind(),
                        listener = entry.id.get(),
                        error = %err,
                        "engine listener failed"
                    );
                }
                Err(_) => {
                    outcome.failed += 1;
                    error!(
                        event = event.kind(),
                        listener = entry.id.get(),
                        "engine listener panicked"
                    );
                }
            }
        }
        outcome
    }
}
