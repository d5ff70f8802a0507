use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::provider::{Analysis, Oscillator, OscillatorProvider, ProviderError};
use crate::types::{Exchange, Instrument, Screener, Signal, Timeframe};

pub const DEFAULT_BASE_URL: &str = "https://scanner.tradingview.com";

/// Client for the TradingView scanner endpoint.
///
/// One POST per (instrument, timeframe) to `{base}/{screener}/scan`. Indicator
/// columns carry the timeframe as a `|<suffix>` qualifier; the daily timeframe
/// is the endpoint default and has no suffix.
pub struct TradingViewProvider {
    client: reqwest::Client,
    base_url: String,
    exchange: Exchange,
    screener: Screener,
    oscillators: Vec<Oscillator>,
    timeout: Duration,
}

impl TradingViewProvider {
    pub fn new(
        base_url: impl Into<String>,
        exchange: Exchange,
        screener: Screener,
        oscillators: Vec<Oscillator>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            exchange,
            screener,
            oscillators,
            timeout,
        })
    }

    fn scan_url(&self) -> String {
        format!(
            "{}/{}/scan",
            self.base_url.trim_end_matches('/'),
            self.screener.0.to_ascii_lowercase()
        )
    }

    fn ticker(&self, instrument: &Instrument) -> String {
        format!("{}:{}", self.exchange.0.to_ascii_uppercase(), instrument.0.to_ascii_uppercase())
    }

    fn map_err(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Http(e)
        }
    }
}

#[async_trait]
impl OscillatorProvider for TradingViewProvider {
    async fn analyze(
        &self,
        instrument: &Instrument,
        timeframe: Timeframe,
    ) -> Result<Analysis, ProviderError> {
        let columns = columns_for(&self.oscillators, timeframe);
        let ticker = self.ticker(instrument);
        let body = json!({
            "symbols": {"tickers": [ticker], "query": {"types": []}},
            "columns": columns,
        });

        let resp = self
            .client
            .post(self.scan_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.map_err(e))?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text.chars().take(256).collect(),
            });
        }

        let values = decode_response(&text, &ticker, columns.len())?;
        Ok(analysis_from_values(&self.oscillators, &values))
    }
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    data: Vec<ScanRow>,
}

#[derive(Debug, Deserialize)]
struct ScanRow {
    #[serde(default)]
    s: String,
    d: Vec<Option<f64>>,
}

/// Scanner column qualifier for a timeframe.
pub fn interval_suffix(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::Minute1 => "|1",
        Timeframe::Minute5 => "|5",
        Timeframe::Minute15 => "|15",
        Timeframe::Minute30 => "|30",
        Timeframe::Hour1 => "|60",
        Timeframe::Hour2 => "|120",
        Timeframe::Hour4 => "|240",
        Timeframe::Day1 => "",
        Timeframe::Week1 => "|1W",
        Timeframe::Month1 => "|1M",
    }
}

fn base_columns(oscillator: Oscillator) -> [&'static str; 2] {
    match oscillator {
        Oscillator::Macd => ["MACD.macd", "MACD.signal"],
        Oscillator::Rsi => ["RSI", "RSI[1]"],
        Oscillator::Mom => ["Mom", "Mom[1]"],
    }
}

/// Requested columns: `close`, `change`, then two per oscillator in order.
pub fn columns_for(oscillators: &[Oscillator], timeframe: Timeframe) -> Vec<String> {
    let suffix = interval_suffix(timeframe);
    let mut cols = vec![format!("close{suffix}"), format!("change{suffix}")];
    for osc in oscillators {
        for c in base_columns(*osc) {
            cols.push(format!("{c}{suffix}"));
        }
    }
    cols
}

/// Extract the value row for `ticker`, checking it has `expected` columns.
pub fn decode_response(
    body: &str,
    ticker: &str,
    expected: usize,
) -> Result<Vec<Option<f64>>, ProviderError> {
    let resp: ScanResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    let row = resp
        .data
        .into_iter()
        .find(|r| r.s.is_empty() || r.s.eq_ignore_ascii_case(ticker))
        .ok_or_else(|| ProviderError::NotFound(ticker.to_string()))?;
    if row.d.len() != expected {
        return Err(ProviderError::Decode(format!(
            "expected {expected} columns, got {}",
            row.d.len()
        )));
    }
    Ok(row.d)
}

/// Inverse of [`columns_for`].
pub fn analysis_from_values(oscillators: &[Oscillator], values: &[Option<f64>]) -> Analysis {
    let get = |i: usize| values.get(i).copied().flatten().filter(|v| v.is_finite());

    let mut out = BTreeMap::new();
    for (idx, osc) in oscillators.iter().enumerate() {
        let (Some(now), Some(other)) = (get(2 + idx * 2), get(3 + idx * 2)) else {
            continue;
        };
        out.insert(*osc, compute(*osc, now, other));
    }

    Analysis {
        oscillators: out,
        close: get(0),
        change_pct: get(1),
    }
}

fn compute(oscillator: Oscillator, a: f64, b: f64) -> Signal {
    match oscillator {
        // a = macd line, b = signal line
        Oscillator::Macd => {
            if a > b {
                Signal::Buy
            } else if a < b {
                Signal::Sell
            } else {
                Signal::Neutral
            }
        }
        // a = current, b = previous bar
        Oscillator::Rsi => {
            if a < 30.0 && b < a {
                Signal::Buy
            } else if a > 70.0 && b > a {
                Signal::Sell
            } else {
                Signal::Neutral
            }
        }
        Oscillator::Mom => {
            if a > b {
                Signal::Buy
            } else if a < b {
                Signal::Sell
            } else {
                Signal::Neutral
            }
        }
    }
}
