mod subscribe;
pub use subscribe::Subscribe;

use serde::{Deserialize, Serialize};

use crate::{Delay, LaunchIndex};

/// What happened during an aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    // run
    AggregationStarted,
    AggregationFinished,
    AggregationAborted,

    // operation lifecycle
    OperationLaunched,
    OperationCompleted,
    OperationFailed,
    OperationCancelled,
    TimeoutHit,
}

/// Single observation emitted by the aggregator.
///
/// Optional fields are populated only for the kinds they make sense for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayEvent {
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<LaunchIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DelayEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            index: None,
            delay: None,
            count: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_index(mut self, index: LaunchIndex) -> Self {
        self.index = Some(index);
        self
    }

    #[inline]
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }

    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_only_requested_fields() {
        let ev = DelayEvent::new(EventKind::OperationFailed)
            .with_index(1)
            .with_reason("boom");

        assert_eq!(ev.index, Some(1));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        assert_eq!(ev.delay, None);

        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"operationFailed","index":1,"reason":"boom"}"#
        );
    }
}
