use crate::DelayEvent;

/// Receiver of aggregation events.
///
/// Called synchronously from the aggregator loop, in emission order, so
/// implementations must not block.
pub trait Subscribe: Send + Sync {
    fn on_event(&self, event: &DelayEvent);

    fn name(&self) -> &'static str;
}
