mod error;
pub use error::{CoreError, CoreResult, OperationError};

mod config;
pub use config::{DelayConfig, ProducerConfig};

pub mod timed;
pub use timed::{RandomDelay, TimedOperation, spawn_timed, spawn_wait_random, wait_random};

pub mod aggregate;
pub use aggregate::{Aggregator, aggregate_delays, task_wait_n, task_wait_n_with};

pub mod producer;
pub use producer::{collect_values, measure_runtime, timed_values, timed_values_with};

mod measure;
pub use measure::measure_time;

pub mod prelude {
    pub use crate::aggregate::{Aggregator, aggregate_delays};
    pub use crate::error::{CoreError, CoreResult, OperationError};
    pub use crate::timed::{RandomDelay, TimedOperation};
    pub use crate::{DelayConfig, ProducerConfig};
}
