use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading pair symbol, base asset followed by quote asset (e.g. `BTCUSDT`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(pub String);

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instrument {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Exchange(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Screener(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candle aggregation period understood by the analytics provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour2,
    Hour4,
    Day1,
    Week1,
    Month1,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour2 => "2h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1W",
            Timeframe::Month1 => "1M",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) and "1m" (minute) differ only by case, so match exactly first.
        let tf = match s.trim() {
            "1m" => Timeframe::Minute1,
            "5m" => Timeframe::Minute5,
            "15m" => Timeframe::Minute15,
            "30m" => Timeframe::Minute30,
            "1h" | "1H" => Timeframe::Hour1,
            "2h" | "2H" => Timeframe::Hour2,
            "4h" | "4H" => Timeframe::Hour4,
            "1d" | "1D" => Timeframe::Day1,
            "1w" | "1W" => Timeframe::Week1,
            "1M" => Timeframe::Month1,
            other => return Err(format!("unknown timeframe `{other}`")),
        };
        Ok(tf)
    }
}

/// One oscillator's view of one instrument on one timeframe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeframeReading {
    pub signal: Signal,
    /// Close of the last completed candle.
    pub close_price: Option<f64>,
    /// Live price at query time, when the provider reports one.
    pub market_price: Option<f64>,
}

impl TimeframeReading {
    pub fn new(signal: Signal, close_price: Option<f64>) -> Self {
        Self {
            signal,
            close_price,
            market_price: None,
        }
    }

    pub fn with_market_price(mut self, price: f64) -> Self {
        self.market_price = Some(price);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Buy,
    Sell,
    SetStopLoss,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Buy, Category::Sell, Category::SetStopLoss];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Buy => "BUY",
            Category::Sell => "SELL",
            Category::SetStopLoss => "SET_STOP_LOSS",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Buy,
    /// Exit at market; the stop is moved to `stop_price` when one is known.
    Sell { stop_price: Option<f64> },
    SetStopLoss { stop_price: f64 },
}

impl Decision {
    pub fn category(&self) -> Category {
        match self {
            Decision::Buy => Category::Buy,
            Decision::Sell { .. } => Category::Sell,
            Decision::SetStopLoss { .. } => Category::SetStopLoss,
        }
    }

    pub fn stop_price(&self) -> Option<f64> {
        match self {
            Decision::Buy => None,
            Decision::Sell { stop_price } => *stop_price,
            Decision::SetStopLoss { stop_price } => Some(*stop_price),
        }
    }
}
