//! Timed operations: produce a value after a bounded random delay.
//!
//! The wait is a cooperative suspension on the tokio timer. It never blocks the
//! thread, so any number of operations can wait out the same wall-clock interval.
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use lapse_model::{Delay, LaunchIndex};

use crate::{
    config::DelayConfig,
    error::{CoreError, CoreResult, OperationError},
};

/// Seam through which the aggregator launches operations.
///
/// Launching is split into two steps: `draw` picks the delay synchronously at launch
/// time and `wait` performs the single suspension.
#[async_trait]
pub trait TimedOperation: Send + Sync + 'static {
    /// Choose the delay for the operation at `index`, within `[0, max_delay]`.
    fn draw(&self, index: LaunchIndex, max_delay: Delay) -> Delay;

    /// Suspend for `delay` and yield it back.
    ///
    /// Must return `OperationError::Cancelled` promptly once `cancel` fires.
    async fn wait(
        &self,
        index: LaunchIndex,
        delay: Delay,
        cancel: CancellationToken,
    ) -> Result<Delay, OperationError>;
}

/// Uniformly random delay backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDelay {
    cfg: DelayConfig,
}

impl RandomDelay {
    pub fn new(cfg: DelayConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl TimedOperation for RandomDelay {
    fn draw(&self, _index: LaunchIndex, max_delay: Delay) -> Delay {
        draw_uniform(max_delay)
    }

    async fn wait(
        &self,
        index: LaunchIndex,
        delay: Delay,
        cancel: CancellationToken,
    ) -> Result<Delay, OperationError> {
        trace!(target: "lapse.core.timed", index, delay, "suspending");
        sleep_for(delay, &self.cfg, &cancel).await
    }
}

/// Pick a delay uniformly from the closed range `[0, max_delay]`.
///
/// `max_delay` must already be validated.
pub fn draw_uniform(max_delay: Delay) -> Delay {
    rand::rng().random_range(0.0..=max_delay)
}

/// Sleep for `delay` units, honoring cancellation and the configured timeout.
///
/// Cancellation wins over an elapsed timer when both are ready at once.
pub async fn sleep_for(
    delay: Delay,
    cfg: &DelayConfig,
    cancel: &CancellationToken,
) -> Result<Delay, OperationError> {
    let sleep = time::sleep(cfg.scale(delay));
    let limited = async {
        match cfg.timeout {
            Some(limit) => time::timeout(limit, sleep)
                .await
                .map_err(|_| OperationError::Timeout(limit)),
            None => {
                sleep.await;
                Ok(())
            }
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OperationError::Cancelled),
        res = limited => res.map(|()| delay),
    }
}

/// Reject bounds that cannot describe a wait.
pub fn validate_max_delay(max_delay: Delay) -> CoreResult<()> {
    if !max_delay.is_finite() || max_delay < 0.0 {
        return Err(CoreError::InvalidArgument(format!(
            "max_delay must be a finite non-negative number, got {max_delay}"
        )));
    }
    Ok(())
}

/// Standalone timed operation with the default one-second unit.
pub async fn wait_random(max_delay: Delay) -> CoreResult<Delay> {
    wait_random_until(max_delay, RandomDelay::default(), CancellationToken::new()).await
}

/// Standalone timed operation that stops early once `cancel` fires.
pub async fn wait_random_until(
    max_delay: Delay,
    op: RandomDelay,
    cancel: CancellationToken,
) -> CoreResult<Delay> {
    validate_max_delay(max_delay)?;
    let delay = op.draw(0, max_delay);
    Ok(op.wait(0, delay, cancel).await?)
}

/// Schedule a timed operation on the runtime right away and hand back its handle.
///
/// The bound is checked before anything is spawned.
pub fn spawn_wait_random(max_delay: Delay) -> CoreResult<JoinHandle<CoreResult<Delay>>> {
    validate_max_delay(max_delay)?;
    Ok(tokio::spawn(wait_random(max_delay)))
}

/// Draw a delay through `op` and run its wait as a runtime task right away.
///
/// The task gets its own token that is never cancelled; stop it with
/// `JoinHandle::abort`.
pub fn spawn_timed(
    op: Arc<dyn TimedOperation>,
    index: LaunchIndex,
    max_delay: Delay,
) -> CoreResult<JoinHandle<Result<Delay, OperationError>>> {
    validate_max_delay(max_delay)?;
    let delay = op.draw(index, max_delay);
    Ok(tokio::spawn(async move {
        op.wait(index, delay, CancellationToken::new()).await
    }))
}
