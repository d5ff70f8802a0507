use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cycle::SignalEngine;
use crate::types::{Category, Instrument};

/// Runs cycles on a fixed cadence until cancelled.
///
/// The interval is measured from the start of each cycle; a cycle that overruns
/// delays the next one rather than triggering a burst. Cancellation is only
/// observed between cycles.
pub struct Scheduler {
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_cycles: None,
        }
    }

    /// Stop after `n` cycles (used for `--once`).
    pub fn with_max_cycles(mut self, n: u64) -> Self {
        self.max_cycles = Some(n);
        self
    }

    /// Returns the number of cycles started. A dropped shutdown sender counts as
    /// a shutdown request.
    pub async fn run(
        &self,
        engine: &SignalEngine,
        instruments: &[Instrument],
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            if *shutdown.borrow() {
                break;
            }
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            cycles += 1;
            match engine.run_cycle(instruments).await {
                Ok(report) => {
                    info!(
                        cycle = report.cycle,
                        buy = report.decisions.count(Category::Buy),
                        sell = report.decisions.count(Category::Sell),
                        set_stop_loss = report.decisions.count(Category::SetStopLoss),
                        failed = report.failed.len(),
                        store_changed = report.reconcile.changed(),
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "cycle complete"
                    );
                    if engine.config().verbose {
                        for (k, v) in engine.metrics().snapshot_kv() {
                            info!(metric = %k, value = %v, "metrics");
                        }
                    }
                }
                Err(e) => error!(error = %e, "cycle aborted, retrying next interval"),
            }
        }

        info!(cycles, "scheduler stopped");
        cycles
    }
}
