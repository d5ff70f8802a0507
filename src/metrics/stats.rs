use hdrhistogram::Histogram;

#[derive(Clone, Debug, Default)]
pub struct QueryCounters {
    pub succeeded: u64,
    pub failed: u64,
    /// Successful queries lacking at least one configured oscillator.
    pub missing_oscillator: u64,
}

impl QueryCounters {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn failure_rate(&self) -> f64 {
        let denom = self.total();
        if denom == 0 {
            return 0.0;
        }
        (self.failed as f64) / (denom as f64)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DecisionCounters {
    pub buy: u64,
    pub sell: u64,
    pub set_stop_loss: u64,
    pub no_action: u64,
}

#[derive(Clone, Debug)]
pub struct Histo {
    /// Values in milliseconds.
    inner: Histogram<u64>,
}

impl Default for Histo {
    fn default() -> Self {
        Self {
            inner: Histogram::new(3).expect("histo"),
        }
    }
}

impl Histo {
    pub fn record(&mut self, v: u64) {
        let _ = self.inner.record(v.max(1));
    }

    pub fn p50(&self) -> u64 {
        self.inner.value_at_quantile(0.50)
    }

    pub fn p95(&self) -> u64 {
        self.inner.value_at_quantile(0.95)
    }

    pub fn max(&self) -> u64 {
        self.inner.max()
    }

    pub fn count(&self) -> u64 {
        self.inner.len()
    }
}

/// Per-timeframe provider statistics.
#[derive(Clone, Debug, Default)]
pub struct TimeframeStats {
    pub queries: QueryCounters,
    pub latency_ms: Histo,
}
