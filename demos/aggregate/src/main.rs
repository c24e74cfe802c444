use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tracing::info;

use lapse_core::{Aggregator, DelayConfig, ProducerConfig, measure_time, timed_values_with};
use lapse_model::Subscribe;
use lapse_observe::{Journal, init_from_env};
use lapse_util::get_path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Logger (LAPSE_LOG / LAPSE_LOG_FORMAT)
    let log = init_from_env()?;
    info!(target: "lapse.demo", format = %log.format, directives = %log.directives, "logger initialized");

    // 2) Run parameters
    let settings = json!({
        "aggregate": {"n": 5, "maxDelay": 3.0},
        "producer": {"count": 4}
    });
    let n = get_path(&settings, &["aggregate", "n"])?.as_u64().unwrap_or(5) as usize;
    let max_delay = get_path(&settings, &["aggregate", "maxDelay"])?
        .as_f64()
        .unwrap_or(3.0);
    let count = get_path(&settings, &["producer", "count"])?
        .as_u64()
        .unwrap_or(10) as usize;

    // 3) Aggregation in completion order
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Journal::new())];
    let aggregator = Aggregator::random(DelayConfig::default().with_unit(Duration::from_millis(500)))
        .with_subscribers(subscribers);
    let results = aggregator.run(n, max_delay).await?;
    info!(
        target: "lapse.demo",
        ordered = results.is_non_decreasing(),
        "delays: {}",
        serde_json::to_string(&results)?
    );

    // 4) Average per-operation time with the default one-second unit
    let avg = measure_time(n, 1.0).await?;
    info!(target: "lapse.demo", avg_ms = avg.as_millis() as u64, "measured average time per operation");

    // 5) Lazy producer
    let producer = ProducerConfig {
        count,
        interval: Duration::from_millis(200),
        ..Default::default()
    };
    let mut values = Box::pin(timed_values_with(producer)?);
    while let Some(value) = values.next().await {
        info!(target: "lapse.demo", value, "produced");
    }

    Ok(())
}
