use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, TaskError};
use crate::task::{Runnable, TaskRef};

/// An asynchronous precondition; success is `Ok(())`.
#[async_trait]
pub trait Condition: Send + Sync {
    async fn evaluate(&self) -> Result<(), BoxError>;
}

/// A closure as a [`Condition`].
pub struct BlockCondition<F> {
    block: F,
}

impl<F, Fut> BlockCondition<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    pub fn new(block: F) -> Self {
        Self { block }
    }
}

#[async_trait]
impl<F, Fut> Condition for BlockCondition<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    async fn evaluate(&self) -> Result<(), BoxError> {
        (self.block)().await
    }
}

/// Gates its inner task behind a set of concurrently evaluated conditions.
///
/// All conditions must succeed before the inner task starts. The first
/// failure fails the gate immediately with that condition's error; sibling
/// evaluations still in flight are left to finish naturally and their
/// outcomes are discarded, not aborted. Conditions are unordered among
/// themselves; only the conjunction matters.
pub struct ConditionTask<T> {
    inner: TaskRef<T>,
    conditions: Vec<Arc<dyn Condition>>,
    token: CancellationToken,
}

impl<T: Send + 'static> ConditionTask<T> {
    pub fn new(inner: TaskRef<T>, conditions: Vec<Arc<dyn Condition>>) -> Self {
        Self {
            inner,
            conditions,
            token: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Runnable for ConditionTask<T> {
    type Output = T;

    async fn run(&self) -> Result<T, TaskError> {
        // Explicit cancellation tears the evaluation group down; a failed
        // sibling does not.
        let group = self.token.child_token();
        let (tx, mut rx) = mpsc::channel::<Result<(), BoxError>>(self.conditions.len().max(1));

        for condition in &self.conditions {
            let condition = Arc::clone(condition);
            let group = group.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = group.cancelled() => {}
                    outcome = condition.evaluate() => {
                        let _ = tx.send(outcome).await;
                    }
                }
            });
        }
        drop(tx);

        let mut pending = self.conditions.len();
        while pending > 0 {
            tokio::select! {
                _ = self.token.cancelled() => return Err(TaskError::Canceled),
                outcome = rx.recv() => match outcome {
                    Some(Ok(())) => pending -= 1,
                    Some(Err(source)) => return Err(TaskError::Condition(source)),
                    None => return Err(TaskError::Canceled),
                },
            }
        }

        if self.token.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        self.inner.run().await
    }

    async fn cancel(&self) {
        self.token.cancel();
        self.inner.cancel().await;
    }
}
