use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::decisions::DecisionSet;
use crate::metrics::stats::{DecisionCounters, TimeframeStats};
use crate::types::{Category, Timeframe};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryOutcome {
    Ok,
    /// Succeeded but at least one requested oscillator was absent.
    MissingOscillator,
    Failed,
}

/// Running totals across cycles, cheap to update from concurrent queries.
#[derive(Default)]
pub struct MetricsEngine {
    timeframes: DashMap<Timeframe, Arc<Mutex<TimeframeStats>>>,
    decisions: Mutex<DecisionCounters>,
    cycles: AtomicU64,
    failed_cycles: AtomicU64,
    /// Flat operator summary, refreshed at the end of every cycle.
    latest_kv: DashMap<String, String>,
}

impl MetricsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_query(&self, timeframe: Timeframe, latency: Duration, outcome: QueryOutcome) {
        let stats = self.timeframe_stats(timeframe);
        let mut s = stats.lock();
        s.latency_ms.record(latency.as_millis() as u64);
        match outcome {
            QueryOutcome::Ok => s.queries.succeeded += 1,
            QueryOutcome::MissingOscillator => {
                s.queries.succeeded += 1;
                s.queries.missing_oscillator += 1;
            }
            QueryOutcome::Failed => s.queries.failed += 1,
        }
    }

    pub fn observe_cycle(
        &self,
        decisions: &DecisionSet,
        evaluated: usize,
        failed: usize,
        elapsed: Duration,
    ) {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut d = self.decisions.lock();
            d.buy += decisions.count(Category::Buy) as u64;
            d.sell += decisions.count(Category::Sell) as u64;
            d.set_stop_loss += decisions.count(Category::SetStopLoss) as u64;
            d.no_action += evaluated.saturating_sub(decisions.len()) as u64;
        }

        self.latest_kv.insert("cycle|count".into(), cycle.to_string());
        self.latest_kv
            .insert("cycle|last_elapsed_ms".into(), elapsed.as_millis().to_string());
        self.latest_kv.insert("cycle|last_failed".into(), failed.to_string());
        for category in Category::ALL {
            self.latest_kv.insert(
                format!("cycle|last_decisions|{category}"),
                decisions.count(category).to_string(),
            );
        }
        self.refresh_timeframe_kv();
    }

    pub fn observe_failed_cycle(&self) {
        let n = self.failed_cycles.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest_kv.insert("cycle|aborted".into(), n.to_string());
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn decision_totals(&self) -> DecisionCounters {
        self.decisions.lock().clone()
    }

    pub fn timeframe(&self, timeframe: Timeframe) -> TimeframeStats {
        self.timeframe_stats(timeframe).lock().clone()
    }

    pub fn snapshot_kv(&self) -> BTreeMap<String, String> {
        self.latest_kv
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().clone()))
            .collect()
    }

    fn refresh_timeframe_kv(&self) {
        let entries: Vec<(Timeframe, TimeframeStats)> = self
            .timeframes
            .iter()
            .map(|e| (*e.key(), e.value().lock().clone()))
            .collect();
        for (tf, s) in entries {
            self.latest_kv.insert(
                format!("provider|{tf}|failure_rate"),
                format!("{:.4}", s.queries.failure_rate()),
            );
            self.latest_kv
                .insert(format!("provider|{tf}|latency_p50_ms"), s.latency_ms.p50().to_string());
            self.latest_kv
                .insert(format!("provider|{tf}|latency_p95_ms"), s.latency_ms.p95().to_string());
            self.latest_kv.insert(
                format!("provider|{tf}|missing_oscillator"),
                s.queries.missing_oscillator.to_string(),
            );
        }
    }

    fn timeframe_stats(&self, timeframe: Timeframe) -> Arc<Mutex<TimeframeStats>> {
        self.timeframes
            .entry(timeframe)
            .or_insert_with(|| Arc::new(Mutex::new(TimeframeStats::default())))
            .clone()
    }
}
