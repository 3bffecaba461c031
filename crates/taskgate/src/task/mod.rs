//! The task contract and the closed set of composable task types.

use std::any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::controller::ExclusivityController;
use crate::error::TaskError;

mod condition;
pub use condition::{BlockCondition, Condition, ConditionTask};
mod delay;
pub use delay::DelayTask;
mod exclusive;
pub use exclusive::MutuallyExclusiveTask;
mod just;
pub use just::JustTask;

/// A unit of asynchronous work.
///
/// `run` is safe to await exactly once per instance; awaiting it twice is
/// unspecified and the decorators in this crate never do it. `cancel` is
/// idempotent and returns once cancellation has been signaled, which is a
/// best-effort request, not a guarantee the work has stopped.
#[async_trait]
pub trait Runnable: Send + Sync {
    type Output: Send;

    async fn run(&self) -> Result<Self::Output, TaskError>;

    async fn cancel(&self);
}

/// Boxed task sharing the [`Runnable`] interface.
///
/// Decorators wrap a `TaskRef` rather than a generic inner type, so chains
/// compose by explicit construction instead of deep generic nesting.
pub type TaskRef<T> = Box<dyn Runnable<Output = T>>;

/// Combinators for wrapping a task with cross-cutting behavior.
pub trait RunnableExt: Runnable + Sized + 'static
where
    Self::Output: 'static,
{
    /// Run this task only after a cancellable suspension of `delay`.
    fn delayed(self, delay: Duration) -> DelayTask<Self::Output> {
        DelayTask::new(Box::new(self), delay)
    }

    /// Run this task only after every condition succeeds.
    fn gated(self, conditions: Vec<Arc<dyn Condition>>) -> ConditionTask<Self::Output> {
        ConditionTask::new(Box::new(self), conditions)
    }

    /// Serialize this task against same-typed tasks on the default controller.
    ///
    /// The key is derived from this task's static type, so differently-typed
    /// tasks never collide on a default key and same-typed ones do, by
    /// design.
    fn exclusive(self) -> MutuallyExclusiveTask<Self::Output> {
        let key = any::type_name::<Self>();
        MutuallyExclusiveTask::new(Box::new(self), key)
    }

    /// Serialize this task under an explicit key on the default controller.
    fn exclusive_with(self, key: impl Into<String>) -> MutuallyExclusiveTask<Self::Output> {
        MutuallyExclusiveTask::new(Box::new(self), key)
    }

    /// Serialize this task on a caller-provided controller.
    ///
    /// `None` falls back to the type-derived default key.
    fn exclusive_on(
        self,
        controller: Arc<ExclusivityController>,
        key: Option<String>,
    ) -> MutuallyExclusiveTask<Self::Output> {
        let key = key.unwrap_or_else(|| any::type_name::<Self>().to_string());
        MutuallyExclusiveTask::with_controller(Box::new(self), key, controller)
    }
}

impl<T> RunnableExt for T
where
    T: Runnable + 'static,
    T::Output: 'static,
{
}
