use serde::{Deserialize, Serialize};

use crate::{Delay, DelayStatus, LaunchIndex};

/// One in-flight timed operation as tracked by the aggregator.
///
/// The produced result is the delay itself, available only once the task has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayTask {
    pub index: LaunchIndex,
    pub delay: Delay,
    pub status: DelayStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Delay>,
}

impl DelayTask {
    /// Create a freshly launched task.
    pub fn pending(index: LaunchIndex, delay: Delay) -> Self {
        Self {
            index,
            delay,
            status: DelayStatus::Pending,
            result: None,
        }
    }

    /// `pending -> completed`; stores the delay as the result.
    ///
    /// Returns `false` (and changes nothing) if the task was already terminal.
    pub fn complete(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = DelayStatus::Completed;
        self.result = Some(self.delay);
        true
    }

    pub fn fail(&mut self) -> bool {
        self.finish(DelayStatus::Failed)
    }

    pub fn cancel(&mut self) -> bool {
        self.finish(DelayStatus::Cancelled)
    }

    fn finish(&mut self, status: DelayStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }
}
