use std::time::Duration;

use lapse_model::Delay;

/// How delays map onto wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayConfig {
    /// Wall-clock length of one delay unit.
    pub unit: Duration,
    /// Optional hard limit for a single operation.
    ///
    /// `None` leaves `max_delay` as a soft bound only.
    pub timeout: Option<Duration>,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            timeout: None,
        }
    }
}

impl DelayConfig {
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wall-clock duration of `delay`.
    ///
    /// `delay` must be finite and non-negative. Products that do not fit in a
    /// `Duration` saturate to `Duration::MAX`, which the tokio timer treats as
    /// a far-future deadline.
    #[inline]
    pub fn scale(&self, delay: Delay) -> Duration {
        Duration::try_from_secs_f64(self.unit.as_secs_f64() * delay).unwrap_or(Duration::MAX)
    }
}

/// Shape of the lazy timed-value sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProducerConfig {
    /// Number of values produced before the sequence ends.
    pub count: usize,
    /// Exclusive upper bound of the produced values; the lower bound is `0`.
    pub upper: f64,
    /// Suspension before each value.
    pub interval: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            count: 10,
            upper: 10.0,
            interval: Duration::from_secs(1),
        }
    }
}
