//! Per-key admission queues serializing mutually exclusive tasks.
//!
//! The controller owns the only shared mutable state in the crate: a map from
//! key to a FIFO queue of admissions. `admit` and `release` take effect under
//! one lock and never interleave; waiting for a turn happens outside the lock
//! on a one-shot release signal.

use std::collections::HashMap;
use std::pin::pin;
use std::sync::{
    Arc, Mutex, OnceLock,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use tokio::sync::Notify;
use tracing::{debug, trace};

/// One-shot signal resolved exactly once, when its queue entry is released.
///
/// Flag-plus-notify rather than a bare `Notify` so that a resolution is never
/// lost to a waiter that has not parked yet, and a stale waiter consuming a
/// wakeup cannot starve the live one.
#[derive(Default)]
struct ReleaseSignal {
    done: AtomicBool,
    notify: Notify,
}

impl ReleaseSignal {
    fn resolve(&self) {
        self.done.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    async fn resolved(&self) {
        let mut notified = pin!(self.notify.notified());
        notified.as_mut().enable();
        if self.done.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }
}

struct Entry {
    id: u64,
    released: Arc<ReleaseSignal>,
}

/// Opaque ticket identifying one queue entry.
///
/// Returned by [`ExclusivityController::admit`]; ids are unique for the
/// process lifetime, so a ticket can appear at most once across all queues.
#[derive(Clone, Debug)]
pub struct Admission {
    id: u64,
    key: String,
}

impl Admission {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Registry mapping a key to the ordered queue of in-flight admissions.
///
/// Explicitly constructed and injectable so independent subsystems and tests
/// can use isolated instances; [`ExclusivityController::global`] provides the
/// process-wide default.
pub struct ExclusivityController {
    queues: Mutex<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl ExclusivityController {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Process-wide default instance.
    pub fn global() -> Arc<ExclusivityController> {
        static GLOBAL: OnceLock<Arc<ExclusivityController>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ExclusivityController::new())))
    }

    /// Append a fresh entry to the key's queue and return its ticket.
    ///
    /// Registration alone grants nothing; the caller proceeds once
    /// [`wait_turn`](Self::wait_turn) resolves for the ticket.
    pub fn admit(&self, key: &str) -> Admission {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut queues = self.queues.lock().unwrap();
        let queue = queues.entry(key.to_string()).or_default();
        queue.push(Entry {
            id,
            released: Arc::new(ReleaseSignal::default()),
        });
        trace!(key, id, depth = queue.len(), "admission registered");

        Admission {
            id,
            key: key.to_string(),
        }
    }

    /// Suspend until the ticket's entry reaches the head of its queue.
    ///
    /// A waiter only ever sleeps on its immediate predecessor's release
    /// signal. Releasing a mid-queue entry (a cancellation) wakes the
    /// successor, which re-checks the queue and chains to whatever is now
    /// ahead of it, so exclusion holds across cancellations while each
    /// wakeup does O(1) work. A ticket already removed from the queue is
    /// treated as admitted; its owner observes cancellation itself.
    pub async fn wait_turn(&self, admission: &Admission) {
        loop {
            let Some(predecessor) = self.predecessor(admission) else {
                return;
            };
            predecessor.resolved().await;
        }
    }

    /// Remove the ticket's entry and resolve its release signal.
    ///
    /// A ticket not present in its queue is silently ignored: success, error
    /// and cancellation paths may all release the same ticket.
    pub fn release(&self, admission: &Admission) {
        let entry = {
            let mut queues = self.queues.lock().unwrap();
            let Some(queue) = queues.get_mut(&admission.key) else {
                trace!(key = %admission.key, id = admission.id, "release: no such queue");
                return;
            };
            let Some(position) = queue.iter().position(|e| e.id == admission.id) else {
                trace!(key = %admission.key, id = admission.id, "release: already released");
                return;
            };
            debug_assert!(
                queue.iter().skip(position + 1).all(|e| e.id != admission.id),
                "admission id enqueued twice"
            );
            let entry = queue.remove(position);
            if queue.is_empty() {
                queues.remove(&admission.key);
            }
            entry
        };

        entry.released.resolve();
        debug!(key = %admission.key, id = admission.id, "admission released");
    }

    /// Whether no admissions are queued for the key.
    pub fn is_idle(&self, key: &str) -> bool {
        self.depth(key) == 0
    }

    /// Number of admissions currently queued for the key.
    pub fn depth(&self, key: &str) -> usize {
        let queues = self.queues.lock().unwrap();
        queues.get(key).map(Vec::len).unwrap_or(0)
    }

    /// Release signal of the entry immediately ahead of the ticket, if any.
    ///
    /// `None` means the ticket is at the head or no longer queued.
    fn predecessor(&self, admission: &Admission) -> Option<Arc<ReleaseSignal>> {
        let queues = self.queues.lock().unwrap();
        let queue = queues.get(&admission.key)?;
        let position = queue.iter().position(|e| e.id == admission.id)?;
        if position == 0 {
            None
        } else {
            Some(Arc::clone(&queue[position - 1].released))
        }
    }
}

impl Default for ExclusivityController {
    fn default() -> Self {
        Self::new()
    }
}
