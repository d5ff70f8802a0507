//! One evaluation pass over the instrument list.

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEvent, AuditSink};
use crate::classifier::{classify, resolve};
use crate::config::BotConfig;
use crate::decisions::DecisionSet;
use crate::emitter::{write_lines, DecisionEmitter, EmitError};
use crate::metrics::{MetricsEngine, QueryOutcome};
use crate::provider::{Analysis, OscillatorProvider, ProviderError};
use crate::reconciler::{reconcile, ReconcileReport};
use crate::store::{PositionStore, StoreError};
use crate::types::{Decision, Instrument, Signal, Timeframe};

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Provider failure for one instrument, with the timeframe that failed.
#[derive(Debug)]
pub struct QueryFailure {
    pub timeframe: Timeframe,
    pub error: ProviderError,
}

#[derive(Clone, Debug)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub evaluated: usize,
    pub decisions: DecisionSet,
    pub failed: Vec<Instrument>,
    pub reconcile: ReconcileReport,
    pub store_digest: String,
}

pub struct SignalEngine {
    cfg: BotConfig,
    provider: Arc<dyn OscillatorProvider>,
    emitter: DecisionEmitter,
    audit: Arc<dyn AuditSink>,
    metrics: MetricsEngine,
    cycle: AtomicU64,
}

impl SignalEngine {
    pub fn new(
        cfg: BotConfig,
        provider: Arc<dyn OscillatorProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let emitter = cfg.emitter();
        Self {
            cfg,
            provider,
            emitter,
            audit,
            metrics: MetricsEngine::new(),
            cycle: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.cfg
    }

    pub fn metrics(&self) -> &MetricsEngine {
        &self.metrics
    }

    pub fn emitter(&self) -> &DecisionEmitter {
        &self.emitter
    }

    /// Query, classify, reconcile, emit.
    ///
    /// A provider failure only excludes that instrument. An unreadable store or
    /// a failed write aborts the cycle after clearing the decision artifacts, so
    /// the executor never acts on a previous cycle's signals.
    pub async fn run_cycle(
        &self,
        instruments: &[Instrument],
    ) -> Result<CycleReport, CycleError> {
        let cycle = self.cycle.fetch_add(1, Ordering::Relaxed) + 1;
        let started_at = Utc::now();
        let t0 = Instant::now();
        info!(cycle, instruments = instruments.len(), "analyzing instruments");

        let results: Vec<(Instrument, Result<Option<Decision>, QueryFailure>)> =
            stream::iter(instruments.iter().cloned())
                .map(|instrument| async move {
                    let outcome = self.evaluate(&instrument).await;
                    (instrument, outcome)
                })
                .buffered(self.cfg.concurrency)
                .collect()
                .await;

        let mut decisions = DecisionSet::new();
        let mut failed = Vec::new();
        for (instrument, outcome) in results {
            match outcome {
                Ok(Some(decision)) => {
                    info!(
                        %instrument,
                        category = %decision.category(),
                        stop = ?decision.stop_price(),
                        "signal detected"
                    );
                    self.journal(AuditEvent::decision(cycle, instrument.clone(), decision));
                    decisions.insert(instrument, decision);
                }
                Ok(None) => {}
                Err(failure) => {
                    warn!(
                        %instrument,
                        timeframe = %failure.timeframe,
                        error = %failure.error,
                        "analysis failed"
                    );
                    self.journal(AuditEvent::provider_failure(
                        cycle,
                        instrument.clone(),
                        failure.timeframe,
                        failure.error.to_string(),
                    ));
                    failed.push(instrument);
                }
            }
        }

        let evaluated = instruments.len() - failed.len();
        match self.commit(&decisions, &failed) {
            Ok((reconcile, store_digest)) => {
                let elapsed = t0.elapsed();
                self.metrics
                    .observe_cycle(&decisions, evaluated, failed.len(), elapsed);
                self.journal(AuditEvent::cycle_completed(
                    cycle,
                    evaluated,
                    decisions.len(),
                    failed.len(),
                    store_digest.clone(),
                ));
                Ok(CycleReport {
                    cycle,
                    started_at,
                    elapsed,
                    evaluated,
                    decisions,
                    failed,
                    reconcile,
                    store_digest,
                })
            }
            Err(e) => {
                self.metrics.observe_failed_cycle();
                self.journal(AuditEvent::cycle_aborted(cycle, e.to_string()));
                Err(e)
            }
        }
    }

    fn commit(
        &self,
        decisions: &DecisionSet,
        failed: &[Instrument],
    ) -> Result<(ReconcileReport, String), CycleError> {
        // Failed instruments are reported whatever happens to the rest of the cycle.
        write_lines(&self.cfg.failed_path, failed)?;

        self.apply(decisions).inspect_err(|e| {
            error!(error = %e, "cycle not committed, clearing signals");
            if let Err(clear_err) = self.emitter.clear() {
                error!(error = %clear_err, "failed to clear signal artifacts");
            }
        })
    }

    /// Reconcile against the store, save it, then publish the signal files.
    fn apply(&self, decisions: &DecisionSet) -> Result<(ReconcileReport, String), CycleError> {
        let mut store = PositionStore::load(&self.cfg.store_path)?;

        let report = reconcile(
            &mut store,
            &decisions.sell_decisions(),
            &decisions.stop_loss_decisions(),
            self.cfg.stop_loss_policy,
        );
        for instrument in &report.not_held {
            debug!(%instrument, "no open position, store not updated");
        }
        // An executor that has never bought anything has no document yet; don't invent one.
        let digest = if store.is_empty() && !self.cfg.store_path.exists() {
            store.digest()?
        } else {
            store.save(&self.cfg.store_path)?
        };
        debug!(
            path = %self.cfg.store_path.display(),
            digest = %digest,
            positions = store.len(),
            "position store written"
        );

        self.emitter.emit(&decisions.by_category())?;
        Ok((report, digest))
    }

    /// Readings are scoped to this call, so a failed query can never reuse
    /// another instrument's data.
    async fn evaluate(
        &self,
        instrument: &Instrument,
    ) -> Result<Option<Decision>, QueryFailure> {
        let daily = self.query(instrument, self.cfg.daily).await?;
        let weekly = self.query(instrument, self.cfg.weekly).await?;

        let votes = self.cfg.oscillators.iter().map(|osc| {
            let d = daily.reading(*osc);
            let w = weekly.reading(*osc);
            if self.cfg.verbose {
                info!(
                    %instrument,
                    oscillator = %osc,
                    daily = %d.signal,
                    weekly = %w.signal,
                    close = ?d.close_price,
                    market = ?d.market_price,
                    "readings"
                );
            }
            if d.signal == Signal::Sell && w.signal == Signal::Buy && d.close_price.is_none() {
                warn!(
                    %instrument,
                    oscillator = %osc,
                    "daily bearish but no close price, cannot place stop"
                );
            }
            classify(&d, &w)
        });
        Ok(resolve(votes))
    }

    async fn query(
        &self,
        instrument: &Instrument,
        timeframe: Timeframe,
    ) -> Result<Analysis, QueryFailure> {
        let t0 = Instant::now();
        let result = self.provider.analyze(instrument, timeframe).await;
        let latency = t0.elapsed();
        match result {
            Ok(analysis) => {
                let missing: Vec<_> = self
                    .cfg
                    .oscillators
                    .iter()
                    .filter(|osc| !analysis.has(**osc))
                    .collect();
                let outcome = if missing.is_empty() {
                    QueryOutcome::Ok
                } else {
                    warn!(
                        %instrument,
                        %timeframe,
                        ?missing,
                        "oscillator missing from analysis, treating as SELL"
                    );
                    QueryOutcome::MissingOscillator
                };
                self.metrics.observe_query(timeframe, latency, outcome);
                Ok(analysis)
            }
            Err(error) => {
                self.metrics
                    .observe_query(timeframe, latency, QueryOutcome::Failed);
                Err(QueryFailure { timeframe, error })
            }
        }
    }

    fn journal(&self, event: AuditEvent) {
        if let Err(e) = self.audit.emit(event) {
            warn!(error = %e, "journal write failed");
        }
    }
}
