use std::borrow::Borrow;

use lapse_model::{DelayEvent, EventKind};
use tracing::{debug, info, trace, warn};

pub trait View {
    fn as_reason(&self) -> &str;
    fn index(&self) -> i64;
    fn delay(&self) -> f64;
    fn count(&self) -> u64;
    fn kind(&self) -> EventKind;
}

impl<T> View for T
where
    T: Borrow<DelayEvent>,
{
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn index(&self) -> i64 {
        self.borrow().index.map_or(-1, |i| i as i64)
    }
    #[inline]
    fn delay(&self) -> f64 {
        self.borrow().delay.unwrap_or(0.0)
    }
    #[inline]
    fn count(&self) -> u64 {
        self.borrow().count.unwrap_or(0) as u64
    }
    #[inline]
    fn kind(&self) -> EventKind {
        self.borrow().kind
    }
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // run
        EventKind::AggregationStarted => "aggregation started",
        EventKind::AggregationFinished => "aggregation finished (all operations completed)",
        EventKind::AggregationAborted => "aggregation aborted; siblings cancelled",

        // operation lifecycle
        EventKind::OperationLaunched => "operation launched",
        EventKind::OperationCompleted => "operation completed",
        EventKind::OperationFailed => "operation failed",
        EventKind::OperationCancelled => "operation cancelled before completion",
        EventKind::TimeoutHit => "operation exceeded its configured timeout",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // run
        EventKind::AggregationStarted => info!(count = e.count(), "{msg}"),
        EventKind::AggregationFinished => info!(count = e.count(), "{msg}"),
        EventKind::AggregationAborted => warn!(
            index = e.index(),
            cancelled = e.count(),
            reason = e.as_reason(),
            "{msg}"
        ),

        // operation lifecycle
        EventKind::OperationLaunched => trace!(index = e.index(), delay = e.delay(), "{msg}"),
        EventKind::OperationCompleted => debug!(index = e.index(), delay = e.delay(), "{msg}"),
        EventKind::OperationCancelled => debug!(index = e.index(), "{msg}"),
        EventKind::OperationFailed => {
            warn!(index = e.index(), reason = e.as_reason(), "{msg}")
        }
        EventKind::TimeoutHit => {
            warn!(index = e.index(), reason = e.as_reason(), "{msg}")
        }
    }
}
