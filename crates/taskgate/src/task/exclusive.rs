use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::controller::{Admission, ExclusivityController};
use crate::error::TaskError;
use crate::task::{Runnable, TaskRef};

/// Serializes its inner task against every other task sharing the same key.
///
/// `run` registers with the controller, waits for its turn, runs the inner
/// task and releases its queue slot on every exit path. Cancellation while
/// queued releases the slot immediately, so successors never wait out a turn
/// that will not come; the slot is released before the cancellation error
/// becomes observable, so a caller may chain another task on the same key
/// right away.
pub struct MutuallyExclusiveTask<T> {
    inner: TaskRef<T>,
    key: String,
    controller: Arc<ExclusivityController>,
    token: CancellationToken,
    admission: Mutex<Option<Admission>>,
}

impl<T: Send + 'static> MutuallyExclusiveTask<T> {
    /// Serialize on the process-wide default controller.
    pub fn new(inner: TaskRef<T>, key: impl Into<String>) -> Self {
        Self::with_controller(inner, key, ExclusivityController::global())
    }

    pub fn with_controller(
        inner: TaskRef<T>,
        key: impl Into<String>,
        controller: Arc<ExclusivityController>,
    ) -> Self {
        Self {
            inner,
            key: key.into(),
            controller,
            token: CancellationToken::new(),
            admission: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl<T: Send + 'static> Runnable for MutuallyExclusiveTask<T> {
    type Output = T;

    async fn run(&self) -> Result<T, TaskError> {
        // Canceled before admission: never enters the queue.
        if self.token.is_cancelled() {
            return Err(TaskError::Canceled);
        }

        let admission = self.controller.admit(&self.key);
        *self.admission.lock().unwrap() = Some(admission.clone());

        tokio::select! {
            _ = self.token.cancelled() => {
                self.controller.release(&admission);
                return Err(TaskError::Canceled);
            }
            _ = self.controller.wait_turn(&admission) => {}
        }
        if self.token.is_cancelled() {
            self.controller.release(&admission);
            return Err(TaskError::Canceled);
        }
        trace!(key = %self.key, "admitted, running inner task");

        let result = self.inner.run().await;
        self.controller.release(&admission);
        result
    }

    async fn cancel(&self) {
        self.token.cancel();
        self.inner.cancel().await;

        // Unblock anyone queued behind this instance right away instead of
        // letting them wait for a completion that will never happen. The
        // second release from `run` is the controller's no-op.
        let admission = self.admission.lock().unwrap().clone();
        if let Some(admission) = admission {
            self.controller.release(&admission);
        }
    }
}
