// src/scheduler.rs
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::pipeline::{Pipeline, RunFailure};

/// Run the pipeline every `interval` (first run immediately).
///
/// Runs that fail are logged and retried on the next tick, except failures that
/// need an operator (corrupt state, bad configuration), which end the loop.
/// `max_runs` bounds the loop; `None` runs until such a failure.
pub async fn run_every(
    pipeline: &Pipeline,
    interval: Duration,
    max_runs: Option<u64>,
) -> Result<u64, RunFailure> {
    // tokio panics on a zero period
    let mut ticker = time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs: u64 = 0;

    loop {
        if max_runs.is_some_and(|max| runs >= max) {
            return Ok(runs);
        }
        ticker.tick().await;
        runs += 1;

        match pipeline.run_once().await {
            Ok(report) => report.log(),
            Err(failure) if failure.error.needs_operator() => return Err(failure),
            Err(failure) => {
                tracing::warn!(
                    run = runs,
                    next_in_secs = interval.as_secs(),
                    error = %failure,
                    "run failed; will retry on next tick"
                );
            }
        }
    }
}
