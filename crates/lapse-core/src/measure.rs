use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use lapse_model::Delay;

use crate::{aggregate::aggregate_delays, error::CoreResult};

/// Average wall-clock time per operation of one [`aggregate_delays`] run.
///
/// Returns `Duration::ZERO` for `n == 0`.
pub async fn measure_time(n: usize, max_delay: Delay) -> CoreResult<Duration> {
    let start = Instant::now();
    aggregate_delays(n, max_delay).await?;
    let total = start.elapsed();

    let per_op = match u32::try_from(n) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => total.div_f64(n as f64),
    };
    debug!(target: "lapse.core.measure", n, total_ms = total.as_millis() as u64, "measured aggregation");
    Ok(per_op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn average_is_bounded_by_max_delay_over_n() {
        let avg = measure_time(5, 2.0).await.unwrap();
        // Operations overlap, so the whole run takes at most ~max_delay.
        assert!(avg <= Duration::from_millis(2_000 / 5 + 1));
    }

    #[tokio::test]
    async fn zero_operations_take_no_time() {
        assert_eq!(measure_time(0, 1.0).await.unwrap(), Duration::ZERO);
    }

    #[tokio::test]
    async fn propagates_invalid_bound() {
        assert!(measure_time(1, -2.0).await.is_err());
    }
}
