//! Completion-order aggregation of concurrently running timed operations.
//!
//! Every operation reports on a shared mpsc channel the moment it finishes. The
//! aggregator reads that channel in arrival order and appends as it goes, so the
//! output order is the real completion order and nothing is ever re-sorted.
//!
//! Failure policy is fail-fast: the first genuine failure cancels every sibling,
//! the aggregator waits for all of them to stop, then reports the failure.
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, StreamExt, stream::FuturesUnordered};
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use lapse_model::{
    Delay, DelayEvent, DelayStatus, DelayTask, EventKind, LaunchIndex, ResultSequence,
    Subscribe,
};

use crate::{
    config::DelayConfig,
    error::{CoreError, CoreResult, OperationError},
    timed::{RandomDelay, TimedOperation, spawn_timed, validate_max_delay},
};

type Completion = (LaunchIndex, Result<Delay, OperationError>);

/// Launches `n` timed operations at once and drains them as they finish.
pub struct Aggregator {
    op: Arc<dyn TimedOperation>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::random(DelayConfig::default())
    }
}

impl Aggregator {
    pub fn new(op: Arc<dyn TimedOperation>) -> Self {
        Self {
            op,
            subscribers: Vec::new(),
        }
    }

    /// Aggregator over uniformly random delays.
    pub fn random(cfg: DelayConfig) -> Self {
        Self::new(Arc::new(RandomDelay::new(cfg)))
    }

    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        for s in &subscribers {
            trace!(target: "lapse.core.aggregate", subscriber = s.name(), "subscriber attached");
        }
        self.subscribers = subscribers;
        self
    }

    /// Run `n` operations bounded by `max_delay` and collect values in completion order.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn run(&self, n: usize, max_delay: Delay) -> CoreResult<ResultSequence> {
        validate_max_delay(max_delay)?;
        if n == 0 {
            trace!(target: "lapse.core.aggregate", "nothing to launch");
            return Ok(ResultSequence::new());
        }
        self.emit(DelayEvent::new(EventKind::AggregationStarted).with_count(n));

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let mut set = JoinSet::new();
        let mut tasks = Vec::with_capacity(n);

        for index in 0..n {
            let delay = self.op.draw(index, max_delay);
            tasks.push(DelayTask::pending(index, delay));

            let op = Arc::clone(&self.op);
            let tx = tx.clone();
            let token = cancel.child_token();
            set.spawn(async move {
                let outcome = AssertUnwindSafe(op.wait(index, delay, token))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(OperationError::Panicked(panic_reason(&*payload)))
                    });
                // Receiver only goes away once the run is over.
                let _ = tx.send((index, outcome));
            });
            self.emit(
                DelayEvent::new(EventKind::OperationLaunched)
                    .with_index(index)
                    .with_delay(delay),
            );
        }
        drop(tx);
        debug!(target: "lapse.core.aggregate", n, "all operations launched");

        let mut results = ResultSequence::with_capacity(n);
        while let Some((index, outcome)) = rx.recv().await {
            match outcome {
                Ok(value) => {
                    if !tasks[index].complete() {
                        warn!(target: "lapse.core.aggregate", index, "duplicate completion ignored");
                        continue;
                    }
                    trace!(target: "lapse.core.aggregate", index, value, "completed");
                    self.emit(
                        DelayEvent::new(EventKind::OperationCompleted)
                            .with_index(index)
                            .with_delay(value),
                    );
                    results.push(value);
                }
                Err(err) => {
                    tasks[index].fail();
                    let kind = match err {
                        OperationError::Timeout(_) => EventKind::TimeoutHit,
                        _ => EventKind::OperationFailed,
                    };
                    self.emit(
                        DelayEvent::new(kind)
                            .with_index(index)
                            .with_reason(err.to_string()),
                    );
                    return Err(self.abort(index, err, cancel, set, rx, tasks).await);
                }
            }
        }

        debug_assert_eq!(results.len(), n);
        self.emit(DelayEvent::new(EventKind::AggregationFinished).with_count(results.len()));
        debug!(target: "lapse.core.aggregate", n, ordered = results.is_non_decreasing(), "aggregation finished");
        Ok(results)
    }

    /// Cancel every sibling, wait for all of them, then build the surfaced error.
    async fn abort(
        &self,
        index: LaunchIndex,
        err: OperationError,
        cancel: CancellationToken,
        mut set: JoinSet<()>,
        mut rx: mpsc::UnboundedReceiver<Completion>,
        mut tasks: Vec<DelayTask>,
    ) -> CoreError {
        debug!(target: "lapse.core.aggregate", index, %err, "operation failed; cancelling siblings");
        cancel.cancel();

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!(target: "lapse.core.aggregate", error = %e, "sibling did not join cleanly");
            }
        }

        rx.close();
        while let Ok((sibling, outcome)) = rx.try_recv() {
            match outcome {
                Err(e) if e.is_cancelled() => {
                    tasks[sibling].cancel();
                    self.emit(DelayEvent::new(EventKind::OperationCancelled).with_index(sibling));
                }
                Ok(value) => {
                    trace!(target: "lapse.core.aggregate", index = sibling, value, "late result discarded");
                    tasks[sibling].complete();
                }
                Err(other) => {
                    trace!(target: "lapse.core.aggregate", index = sibling, error = %other, "late failure discarded");
                    tasks[sibling].fail();
                }
            }
        }

        let cancelled = tasks
            .iter()
            .filter(|t| t.status == DelayStatus::Cancelled)
            .count();
        self.emit(
            DelayEvent::new(EventKind::AggregationAborted)
                .with_index(index)
                .with_count(cancelled)
                .with_reason(err.to_string()),
        );
        CoreError::AggregationFailed { index, source: err }
    }

    #[inline]
    fn emit(&self, event: DelayEvent) {
        for s in &self.subscribers {
            s.on_event(&event);
        }
    }
}

/// Run `n` random-delay operations with the default configuration.
pub async fn aggregate_delays(n: usize, max_delay: Delay) -> CoreResult<Vec<Delay>> {
    Aggregator::default()
        .run(n, max_delay)
        .await
        .map(ResultSequence::into_vec)
}

/// Same contract as [`aggregate_delays`], built from individually spawned task handles.
///
/// Handles are drained as they resolve; on the first failure the remaining handles
/// are aborted and awaited before the error is returned.
pub async fn task_wait_n(n: usize, max_delay: Delay) -> CoreResult<Vec<Delay>> {
    task_wait_n_with(n, max_delay, Arc::new(RandomDelay::default())).await
}

/// [`task_wait_n`] over an arbitrary [`TimedOperation`].
///
/// Dropping the returned future aborts every task it spawned.
#[instrument(level = "debug", skip(op), err)]
pub async fn task_wait_n_with(
    n: usize,
    max_delay: Delay,
    op: Arc<dyn TimedOperation>,
) -> CoreResult<Vec<Delay>> {
    validate_max_delay(max_delay)?;

    let mut guard = AbortOnDrop(Vec::with_capacity(n));
    let mut pending = FuturesUnordered::new();
    for index in 0..n {
        let handle = spawn_timed(Arc::clone(&op), index, max_delay)?;
        guard.0.push(handle.abort_handle());
        pending.push(handle.map(move |joined| (index, joined)));
    }

    let mut results = Vec::with_capacity(n);
    while let Some((index, joined)) = pending.next().await {
        let failure = match joined {
            Ok(Ok(value)) => {
                results.push(value);
                continue;
            }
            Ok(Err(err)) => err,
            Err(join) if join.is_panic() => {
                OperationError::Panicked(panic_reason(&*join.into_panic()))
            }
            Err(join) => OperationError::Fault(join.to_string()),
        };

        debug!(target: "lapse.core.aggregate", index, %failure, "task failed; aborting the rest");
        guard.abort_all();
        while pending.next().await.is_some() {}
        return Err(CoreError::AggregationFailed {
            index,
            source: failure,
        });
    }
    Ok(results)
}

/// Aborts the tracked tasks when dropped, so a dropped caller leaves nothing running.
struct AbortOnDrop(Vec<AbortHandle>);

impl AbortOnDrop {
    fn abort_all(&self) {
        self.0.iter().for_each(AbortHandle::abort);
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.abort_all();
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::{self, Instant};

    use super::*;
    use crate::timed::sleep_for;

    /// Deterministic operation that records when each index launched, finished,
    /// observed cancellation or was dropped mid-wait.
    #[derive(Default)]
    struct Scripted {
        delays: Vec<Delay>,
        fail_at: Option<LaunchIndex>,
        panic_at: Option<LaunchIndex>,
        launches: Mutex<Vec<(LaunchIndex, Instant)>>,
        completions: Mutex<Vec<(LaunchIndex, Instant)>>,
        cancelled: Mutex<Vec<LaunchIndex>>,
        dropped: Mutex<Vec<LaunchIndex>>,
    }

    fn sorted(log: &Mutex<Vec<LaunchIndex>>) -> Vec<LaunchIndex> {
        let mut v = log.lock().unwrap().clone();
        v.sort_unstable();
        v
    }

    /// Records its index unless the wait it guards ran to the end.
    struct DropWatch<'a> {
        index: LaunchIndex,
        log: &'a Mutex<Vec<LaunchIndex>>,
        finished: bool,
    }

    impl Drop for DropWatch<'_> {
        fn drop(&mut self) {
            if !self.finished {
                self.log.lock().unwrap().push(self.index);
            }
        }
    }

    impl Scripted {
        fn new(delays: &[Delay]) -> Self {
            Self {
                delays: delays.to_vec(),
                ..Default::default()
            }
        }

        fn failing_at(mut self, index: LaunchIndex) -> Self {
            self.fail_at = Some(index);
            self
        }

        fn panicking_at(mut self, index: LaunchIndex) -> Self {
            self.panic_at = Some(index);
            self
        }
    }

    #[async_trait]
    impl TimedOperation for Scripted {
        fn draw(&self, index: LaunchIndex, _max_delay: Delay) -> Delay {
            self.delays[index]
        }

        async fn wait(
            &self,
            index: LaunchIndex,
            delay: Delay,
            cancel: CancellationToken,
        ) -> Result<Delay, OperationError> {
            self.launches.lock().unwrap().push((index, Instant::now()));
            let mut watch = DropWatch {
                index,
                log: &self.dropped,
                finished: false,
            };

            let slept = sleep_for(delay, &DelayConfig::default(), &cancel).await;
            watch.finished = true;
            let value = match slept {
                Ok(value) => value,
                Err(OperationError::Cancelled) => {
                    self.cancelled.lock().unwrap().push(index);
                    return Err(OperationError::Cancelled);
                }
                Err(e) => return Err(e),
            };

            if self.panic_at == Some(index) {
                panic!("scripted panic");
            }
            if self.fail_at == Some(index) {
                return Err(OperationError::Fault(format!("injected at {index}")));
            }
            self.completions.lock().unwrap().push((index, Instant::now()));
            Ok(value)
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<DelayEvent>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<EventKind> {
            self.events.lock().unwrap().iter().map(|e| e.kind).collect()
        }
    }

    impl Subscribe for Recorder {
        fn on_event(&self, event: &DelayEvent) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn results_follow_completion_order_not_launch_order() {
        let op = Arc::new(Scripted::new(&[0.3, 0.1, 0.2]));
        let agg = Aggregator::new(op.clone());

        let seq = agg.run(3, 1.0).await.unwrap();
        assert_eq!(seq.as_slice(), &[0.1, 0.2, 0.3]);

        let launched: Vec<_> = op.launches.lock().unwrap().iter().map(|(i, _)| *i).collect();
        assert_eq!(launched, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn every_launch_precedes_first_completion() {
        let op = Arc::new(Scripted::new(&[0.5, 0.05, 0.4, 0.2]));
        let rec = Arc::new(Recorder::default());
        let agg = Aggregator::new(op.clone()).with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>]);

        agg.run(4, 1.0).await.unwrap();

        let launches = op.launches.lock().unwrap();
        let completions = op.completions.lock().unwrap();
        assert_eq!(launches.len(), 4);
        let last_launch = launches.iter().map(|(_, t)| *t).max().unwrap();
        let first_completion = completions.iter().map(|(_, t)| *t).min().unwrap();
        assert!(last_launch < first_completion);

        let kinds = rec.kinds();
        let first_done = kinds
            .iter()
            .position(|k| *k == EventKind::OperationCompleted)
            .unwrap();
        let launched_before = kinds[..first_done]
            .iter()
            .filter(|k| **k == EventKind::OperationLaunched)
            .count();
        assert_eq!(launched_before, 4);
        assert_eq!(kinds.last(), Some(&EventKind::AggregationFinished));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_operations_launch_nothing() {
        let op = Arc::new(Scripted::new(&[]));
        let rec = Arc::new(Recorder::default());
        let agg = Aggregator::new(op.clone()).with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>]);

        let seq = agg.run(0, 5.0).await.unwrap();

        assert!(seq.is_empty());
        assert!(op.launches.lock().unwrap().is_empty());
        assert!(rec.kinds().is_empty());
    }

    #[tokio::test]
    async fn invalid_bound_is_rejected_before_launch() {
        let op = Arc::new(Scripted::new(&[0.1]));
        let agg = Aggregator::new(op.clone());

        let err = agg.run(1, -1.0).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(op.launches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_cancels_pending_siblings() {
        let op = Arc::new(Scripted::new(&[0.1, 0.2, 0.3]).failing_at(1));
        let rec = Arc::new(Recorder::default());
        let agg = Aggregator::new(op.clone()).with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>]);

        let err = agg.run(3, 1.0).await.unwrap_err();
        assert_eq!(
            err,
            CoreError::AggregationFailed {
                index: 1,
                source: OperationError::Fault("injected at 1".into()),
            }
        );

        assert_eq!(*op.cancelled.lock().unwrap(), vec![2]);
        let kinds = rec.kinds();
        assert!(kinds.contains(&EventKind::OperationFailed));
        assert!(kinds.contains(&EventKind::OperationCancelled));
        assert_eq!(kinds.last(), Some(&EventKind::AggregationAborted));

        let aborted = rec.events.lock().unwrap().last().cloned().unwrap();
        assert_eq!(aborted.count, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_operation_fails_the_run() {
        let op = Arc::new(Scripted::new(&[0.2, 0.1, 0.3]).panicking_at(1));
        let agg = Aggregator::new(op.clone());

        let err = agg.run(3, 1.0).await.unwrap_err();
        match err {
            CoreError::AggregationFailed {
                index: 1,
                source: OperationError::Panicked(reason),
            } => assert_eq!(reason, "scripted panic"),
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(sorted(&op.cancelled), vec![0, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_bound_times_out_instead_of_panicking() {
        let cfg = DelayConfig::default().with_timeout(Duration::from_secs(1));
        let agg = Aggregator::random(cfg);

        let err = agg.run(3, 1e20).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::AggregationFailed {
                source: OperationError::Timeout(limit),
                ..
            } if limit == Duration::from_secs(1)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_reported_as_aggregation_failure() {
        let cfg = DelayConfig::default().with_timeout(Duration::from_millis(1));
        let rec = Arc::new(Recorder::default());
        let agg = Aggregator::random(cfg).with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>]);

        // Eight draws from [0, 10] all landing under 1ms is practically impossible.
        let err = agg.run(8, 10.0).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::AggregationFailed {
                source: OperationError::Timeout(_),
                ..
            }
        ));
        assert!(rec.kinds().contains(&EventKind::TimeoutHit));
    }

    #[tokio::test(start_paused = true)]
    async fn aggregate_delays_returns_n_bounded_values() {
        let values = aggregate_delays(10, 5.0).await.unwrap();

        assert_eq!(values.len(), 10);
        assert!(values.iter().all(|v| (0.0..=5.0).contains(v)));
    }

    #[tokio::test(start_paused = true)]
    async fn aggregate_delays_with_zero_bound_yields_zeros() {
        let values = aggregate_delays(3, 0.0).await.unwrap();
        assert_eq!(values, vec![0.0, 0.0, 0.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn task_wait_n_matches_aggregate_contract() {
        let values = task_wait_n(5, 3.0).await.unwrap();

        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|v| (0.0..=3.0).contains(v)));

        assert!(task_wait_n(0, 3.0).await.unwrap().is_empty());
        assert!(task_wait_n(2, -3.0).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn task_wait_n_drains_in_completion_order() {
        let op = Arc::new(Scripted::new(&[0.3, 0.1, 0.2]));

        let values = task_wait_n_with(3, 1.0, op).await.unwrap();
        assert_eq!(values, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test(start_paused = true)]
    async fn task_wait_n_failure_aborts_remaining_tasks() {
        let op = Arc::new(Scripted::new(&[0.1, 0.2, 0.3]).failing_at(1));

        let err = task_wait_n_with(3, 1.0, op.clone()).await.unwrap_err();
        assert_eq!(
            err,
            CoreError::AggregationFailed {
                index: 1,
                source: OperationError::Fault("injected at 1".into()),
            }
        );

        assert_eq!(*op.dropped.lock().unwrap(), vec![2]);
        let finished: Vec<_> = op.completions.lock().unwrap().iter().map(|(i, _)| *i).collect();
        assert_eq!(finished, vec![0]);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(op.completions.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn task_wait_n_panic_is_reported_with_its_index() {
        let op = Arc::new(Scripted::new(&[0.2, 0.1, 0.3]).panicking_at(1));

        let err = task_wait_n_with(3, 1.0, op.clone()).await.unwrap_err();
        assert_eq!(
            err,
            CoreError::AggregationFailed {
                index: 1,
                source: OperationError::Panicked("scripted panic".into()),
            }
        );
        assert_eq!(sorted(&op.dropped), vec![0, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_task_wait_n_aborts_its_tasks() {
        let op = Arc::new(Scripted::new(&[0.1, 0.2, 0.3]));

        let res = time::timeout(
            Duration::from_millis(50),
            task_wait_n_with(3, 1.0, op.clone()),
        )
        .await;
        assert!(res.is_err());

        time::sleep(Duration::from_secs(1)).await;
        assert!(op.completions.lock().unwrap().is_empty());
        assert_eq!(sorted(&op.dropped), vec![0, 1, 2]);
    }
}
