use std::time::Duration;

use lapse_model::LaunchIndex;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced to callers of the core API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// First genuine failure among the launched operations.
    ///
    /// Every sibling has been cancelled and joined by the time this is returned.
    #[error("aggregation failed at operation {index}: {source}")]
    AggregationFailed {
        index: LaunchIndex,
        #[source]
        source: OperationError,
    },
    /// Failure of a standalone timed operation (outside of any aggregation).
    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Outcome of a single timed operation that did not produce a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("cancelled")]
    Cancelled,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("fault: {0}")]
    Fault(String),
    #[error("panicked: {0}")]
    Panicked(String),
}

impl OperationError {
    /// Outcome of a sibling stopped by fail-fast rather than a failure of its own.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationError::Cancelled)
    }
}
