use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::task::Runnable;

type Computation<T> = Pin<Box<dyn Future<Output = Result<T, TaskError>> + Send>>;

/// A plain value or future as a task; the base building block.
pub struct JustTask<T> {
    computation: Mutex<Option<Computation<T>>>,
    token: CancellationToken,
}

impl<T: Send + 'static> JustTask<T> {
    /// Wrap a not-yet-awaited computation.
    pub fn new<F>(computation: F) -> Self
    where
        F: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self {
            computation: Mutex::new(Some(Box::pin(computation))),
            token: CancellationToken::new(),
        }
    }

    /// Wrap a constant, returned as-is by `run`.
    pub fn value(value: T) -> Self {
        Self::new(async move { Ok(value) })
    }
}

#[async_trait]
impl<T: Send + 'static> Runnable for JustTask<T> {
    type Output = T;

    async fn run(&self) -> Result<T, TaskError> {
        let computation = self.computation.lock().unwrap().take();
        let Some(computation) = computation else {
            return Err(TaskError::Canceled);
        };
        tokio::select! {
            _ = self.token.cancelled() => Err(TaskError::Canceled),
            result = computation => result,
        }
    }

    async fn cancel(&self) {
        // A no-op if the computation already completed.
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn returns_wrapped_value() {
        let task = JustTask::value("payload");
        assert_eq!(task.run().await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn runs_wrapped_computation() {
        let task = JustTask::new(async { Ok(2 + 2) });
        assert_eq!(task.run().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn propagates_computation_error() {
        let task: JustTask<()> = JustTask::new(async { Err(TaskError::fail("boom")) });
        let err = task.run().await.unwrap_err();
        assert!(matches!(err, TaskError::Fail(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn cancel_interrupts_in_flight_computation() {
        let task = Arc::new(JustTask::new(async {
            sleep(Duration::from_secs(60)).await;
            Ok("never")
        }));

        let running = tokio::spawn({
            let task = Arc::clone(&task);
            async move { task.run().await }
        });
        sleep(Duration::from_millis(10)).await;
        task.cancel().await;

        let err = running.await.unwrap().unwrap_err();
        assert!(err.is_canceled());
    }

    #[tokio::test]
    async fn cancel_after_completion_is_noop() {
        let task = JustTask::value(7);
        assert_eq!(task.run().await.unwrap(), 7);
        task.cancel().await;
    }
}
