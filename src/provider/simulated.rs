use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::provider::{Analysis, Oscillator, OscillatorProvider, ProviderError};
use crate::types::{Instrument, Signal, Timeframe};

/// Offline provider producing random readings, for dry runs.
///
/// Each oscillator is independently BUY/SELL/NEUTRAL; a small fraction of
/// queries fail so the failure path gets exercised too.
pub struct SimulatedProvider {
    oscillators: Vec<Oscillator>,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedProvider {
    pub fn new(oscillators: Vec<Oscillator>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            oscillators,
            failure_rate: 0.02,
            rng: Mutex::new(rng),
        }
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }
}

#[async_trait]
impl OscillatorProvider for SimulatedProvider {
    async fn analyze(
        &self,
        instrument: &Instrument,
        _timeframe: Timeframe,
    ) -> Result<Analysis, ProviderError> {
        let mut rng = self.rng.lock();
        if rng.gen_bool(self.failure_rate) {
            return Err(ProviderError::NotFound(format!("sim:{instrument}")));
        }

        let oscillators: BTreeMap<Oscillator, Signal> = self
            .oscillators
            .iter()
            .map(|osc| {
                let signal = match rng.gen_range(0..3) {
                    0 => Signal::Buy,
                    1 => Signal::Sell,
                    _ => Signal::Neutral,
                };
                (*osc, signal)
            })
            .collect();

        let close = rng.gen_range(0.01..=70_000.0f64);
        let change_pct = rng.gen_range(-8.0..=8.0f64);
        Ok(Analysis {
            oscillators,
            close: Some(close),
            change_pct: Some(change_pct),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_runs_are_reproducible() {
        let a = SimulatedProvider::new(vec![Oscillator::Macd], Some(7)).with_failure_rate(0.0);
        let b = SimulatedProvider::new(vec![Oscillator::Macd], Some(7)).with_failure_rate(0.0);
        let btc = Instrument::from("BTCUSDT");
        for _ in 0..5 {
            let x = a.analyze(&btc, Timeframe::Day1).await.unwrap();
            let y = b.analyze(&btc, Timeframe::Day1).await.unwrap();
            assert_eq!(x, y);
            assert!(x.has(Oscillator::Macd));
        }
    }

    #[tokio::test]
    async fn full_failure_rate_always_fails() {
        let p = SimulatedProvider::new(vec![Oscillator::Macd], Some(1)).with_failure_rate(1.0);
        let res = p.analyze(&Instrument::from("DOGEUSDT"), Timeframe::Week1).await;
        assert!(matches!(res, Err(ProviderError::NotFound(_))));
    }
}
