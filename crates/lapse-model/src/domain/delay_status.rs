use serde::{Deserialize, Serialize};

/// Lifecycle state of a single timed operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DelayStatus {
    /// Launched and still waiting for its delay to elapse.
    #[default]
    Pending,
    /// Delay elapsed and the value was produced.
    Completed,
    /// Operation reported a fault (or hit its timeout).
    Failed,
    /// Operation observed the cancellation signal and produced nothing.
    Cancelled,
}

impl DelayStatus {
    /// Returns `true` if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DelayStatus::Pending)
    }
}
