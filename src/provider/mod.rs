use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::types::{Instrument, Signal, Timeframe, TimeframeReading};

pub mod simulated;
pub mod tradingview;

/// Oscillators the providers know how to classify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Oscillator {
    Macd,
    Rsi,
    Mom,
}

impl Oscillator {
    pub fn name(self) -> &'static str {
        match self {
            Oscillator::Macd => "MACD",
            Oscillator::Rsi => "RSI",
            Oscillator::Mom => "Mom",
        }
    }
}

impl fmt::Display for Oscillator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Oscillator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MACD" => Ok(Oscillator::Macd),
            "RSI" => Ok(Oscillator::Rsi),
            "MOM" => Ok(Oscillator::Mom),
            other => Err(format!("unsupported oscillator `{other}` (expected MACD, RSI or Mom)")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("exchange or symbol not found: {0}")]
    NotFound(String),
    #[error("malformed provider response: {0}")]
    Decode(String),
    #[error("provider query timed out after {0:?}")]
    Timeout(Duration),
}

/// Provider answer for one instrument on one timeframe.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Classified oscillators. Oscillators the provider had no data for are absent.
    pub oscillators: BTreeMap<Oscillator, Signal>,
    /// Price of the current (possibly still open) candle.
    pub close: Option<f64>,
    /// Percent change of `close` against the previous candle's close.
    pub change_pct: Option<f64>,
}

impl Analysis {
    /// Close of the last completed candle, derived from the percent change.
    pub fn previous_close(&self) -> Option<f64> {
        let close = self.close?;
        let change = self.change_pct?;
        let denom = 1.0 + change / 100.0;
        if denom <= 0.0 || !denom.is_finite() {
            return None;
        }
        Some(close / denom)
    }

    /// Reduce to the reading the classifier consumes for `oscillator`.
    ///
    /// A missing oscillator reads as SELL so that a gap in the data can never
    /// produce a buy.
    pub fn reading(&self, oscillator: Oscillator) -> TimeframeReading {
        let signal = self
            .oscillators
            .get(&oscillator)
            .copied()
            .unwrap_or(Signal::Sell);
        match self.previous_close() {
            Some(prev) => TimeframeReading {
                signal,
                close_price: Some(prev),
                market_price: self.close,
            },
            None => TimeframeReading {
                signal,
                close_price: self.close,
                market_price: None,
            },
        }
    }

    pub fn has(&self, oscillator: Oscillator) -> bool {
        self.oscillators.contains_key(&oscillator)
    }
}

#[async_trait]
pub trait OscillatorProvider: Send + Sync {
    async fn analyze(
        &self,
        instrument: &Instrument,
        timeframe: Timeframe,
    ) -> Result<Analysis, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_oscillator_reads_as_sell() {
        let analysis = Analysis {
            oscillators: BTreeMap::from([(Oscillator::Rsi, Signal::Buy)]),
            close: Some(10.0),
            change_pct: None,
        };
        let reading = analysis.reading(Oscillator::Macd);
        assert_eq!(reading.signal, Signal::Sell);
        assert_eq!(reading.close_price, Some(10.0));
        assert_eq!(reading.market_price, None);
    }

    #[test]
    fn previous_close_from_change() {
        let analysis = Analysis {
            oscillators: BTreeMap::from([(Oscillator::Macd, Signal::Sell)]),
            close: Some(110.0),
            change_pct: Some(10.0),
        };
        let reading = analysis.reading(Oscillator::Macd);
        let prev = reading.close_price.unwrap();
        assert!((prev - 100.0).abs() < 1e-9);
        assert_eq!(reading.market_price, Some(110.0));
    }

    #[test]
    fn oscillator_names_parse() {
        assert_eq!("macd".parse::<Oscillator>().unwrap(), Oscillator::Macd);
        assert_eq!("Mom".parse::<Oscillator>().unwrap(), Oscillator::Mom);
        assert!("AO".parse::<Oscillator>().is_err());
    }
}
