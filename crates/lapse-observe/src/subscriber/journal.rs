use lapse_model::{DelayEvent, Subscribe};

use crate::subscriber::view::log_event;

/// Renders every aggregation event as a `tracing` record.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for Journal {
    fn on_event(&self, event: &DelayEvent) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "journal"
    }
}
