//! Lazy, finite sequence of random values with a fixed pause before each one.
use std::time::Duration;

use futures::{Stream, StreamExt, future::join_all, stream};
use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use crate::{
    config::ProducerConfig,
    error::{CoreError, CoreResult},
};

/// Number of sequences [`measure_runtime`] consumes side by side.
const PARALLEL_RUNS: usize = 4;

/// Ten values in `[0, 10)`, one second apart.
///
/// Every call returns a fresh, independent sequence. Once exhausted it keeps
/// yielding `None`.
pub fn timed_values() -> impl Stream<Item = f64> + Send + 'static {
    produce(ProducerConfig::default())
}

/// Like [`timed_values`] with a custom shape.
pub fn timed_values_with(cfg: ProducerConfig) -> CoreResult<impl Stream<Item = f64> + Send + 'static> {
    if !cfg.upper.is_finite() || cfg.upper <= 0.0 {
        return Err(CoreError::InvalidArgument(format!(
            "producer upper bound must be a finite positive number, got {}",
            cfg.upper
        )));
    }
    Ok(produce(cfg))
}

fn produce(cfg: ProducerConfig) -> impl Stream<Item = f64> + Send + 'static {
    stream::unfold(0usize, move |produced| async move {
        if produced >= cfg.count {
            return None;
        }
        time::sleep(cfg.interval).await;
        let value = rand::rng().random_range(0.0..cfg.upper);
        trace!(target: "lapse.core.producer", produced, value, "value produced");
        Some((value, produced + 1))
    })
    .fuse()
}

/// Drain one default sequence into a vector.
pub async fn collect_values() -> Vec<f64> {
    timed_values().collect().await
}

/// Wall-clock time to drain four default sequences concurrently.
///
/// Because the sequences only suspend, this is roughly the length of one of them.
pub async fn measure_runtime() -> Duration {
    let start = Instant::now();
    let runs = join_all((0..PARALLEL_RUNS).map(|_| collect_values())).await;
    let elapsed = start.elapsed();

    debug!(
        target: "lapse.core.producer",
        runs = runs.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "parallel collection finished"
    );
    elapsed
}
