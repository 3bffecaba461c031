//! Composable asynchronous tasks with keyed mutual exclusion.
//!
//! A task is anything implementing [`Runnable`]: start it with `run`, stop it
//! with `cancel`. Plain values and futures become tasks via [`JustTask`];
//! cross-cutting behavior is layered on by construction: [`DelayTask`] runs
//! its inner task after a cancellable suspension, [`ConditionTask`] gates it
//! behind a set of concurrently evaluated preconditions, and
//! [`MutuallyExclusiveTask`] serializes it against every other task sharing
//! the same key through an [`ExclusivityController`].

pub mod error;
pub use error::{BoxError, TaskError};

pub mod controller;
pub use controller::{Admission, ExclusivityController};

pub mod task;
pub use task::{
    BlockCondition, Condition, ConditionTask, DelayTask, JustTask, MutuallyExclusiveTask,
    Runnable, RunnableExt, TaskRef,
};

pub mod prelude {
    pub use crate::controller::{Admission, ExclusivityController};
    pub use crate::error::{BoxError, TaskError};
    pub use crate::task::{
        BlockCondition, Condition, ConditionTask, DelayTask, JustTask, MutuallyExclusiveTask,
        Runnable, RunnableExt, TaskRef,
    };
}
