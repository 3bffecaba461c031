use std::time::Duration;

use async_trait::async_trait;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::task::{Runnable, TaskRef};

/// Runs its inner task after a cooperative, cancellable suspension.
///
/// Canceled during the suspension, `run` fails with
/// [`TaskError::Canceled`] and the inner task is never started.
pub struct DelayTask<T> {
    inner: TaskRef<T>,
    delay: Duration,
    token: CancellationToken,
}

impl<T: Send + 'static> DelayTask<T> {
    pub fn new(inner: TaskRef<T>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            token: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Runnable for DelayTask<T> {
    type Output = T;

    async fn run(&self) -> Result<T, TaskError> {
        tokio::select! {
            _ = self.token.cancelled() => return Err(TaskError::Canceled),
            _ = time::sleep(self.delay) => {}
        }
        self.inner.run().await
    }

    async fn cancel(&self) {
        self.token.cancel();
        self.inner.cancel().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::JustTask;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;
    use tokio::time::sleep;

    fn flagging_task(flag: &Arc<AtomicBool>) -> JustTask<&'static str> {
        let flag = Arc::clone(flag);
        JustTask::new(async move {
            flag.store(true, Ordering::SeqCst);
            Ok("done")
        })
    }

    #[tokio::test]
    async fn suspends_then_runs_inner() {
        let task = DelayTask::new(
            Box::new(JustTask::value("after")),
            Duration::from_millis(50),
        );

        let started = Instant::now();
        assert_eq!(task.run().await.unwrap(), "after");
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn cancel_during_suspension_skips_inner() {
        let started = Arc::new(AtomicBool::new(false));
        let task = Arc::new(DelayTask::new(
            Box::new(flagging_task(&started)),
            Duration::from_secs(60),
        ));

        let running = tokio::spawn({
            let task = Arc::clone(&task);
            async move { task.run().await }
        });
        sleep(Duration::from_millis(10)).await;
        task.cancel().await;

        let err = running.await.unwrap().unwrap_err();
        assert!(err.is_canceled());
        assert!(!started.load(Ordering::SeqCst), "inner task must not start");
    }

    #[tokio::test]
    async fn inner_error_passes_through() {
        let task: DelayTask<()> = DelayTask::new(
            Box::new(JustTask::new(async { Err(TaskError::fail("inner failed")) })),
            Duration::from_millis(1),
        );
        let err = task.run().await.unwrap_err();
        assert!(matches!(err, TaskError::Fail(_)));
    }
}
