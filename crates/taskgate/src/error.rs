use thiserror::Error;

/// Boxed error produced by wrapped computations and conditions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum TaskError {
    /// The task, or its wait for admission, was canceled before completion.
    #[error("task canceled")]
    Canceled,
    /// The first failing precondition of a condition gate.
    #[error("condition failed: {0}")]
    Condition(#[source] BoxError),
    /// Error produced by the wrapped computation, carried unchanged.
    #[error("{0}")]
    Fail(BoxError),
}

impl TaskError {
    pub fn fail(source: impl Into<BoxError>) -> Self {
        TaskError::Fail(source.into())
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}
