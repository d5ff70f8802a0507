#![allow(dead_code)]

use async_trait::async_trait;
use clap::Parser;
use signal_decision_bot::config::{Args, BotConfig};
use signal_decision_bot::provider::{Analysis, Oscillator, OscillatorProvider, ProviderError};
use signal_decision_bot::types::{Instrument, Signal, Timeframe};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Provider answering from a table; unknown (instrument, timeframe) pairs fail.
#[derive(Default)]
pub struct ScriptedProvider {
    answers: Mutex<HashMap<(Instrument, Timeframe), Analysis>>,
    calls: Mutex<Vec<(Instrument, Timeframe)>>,
}

impl ScriptedProvider {
    pub fn set(&self, symbol: &str, timeframe: Timeframe, analysis: Analysis) {
        self.answers
            .lock()
            .unwrap()
            .insert((Instrument::from(symbol), timeframe), analysis);
    }

    pub fn set_pair(&self, symbol: &str, daily: Analysis, weekly: Analysis) {
        self.set(symbol, Timeframe::Day1, daily);
        self.set(symbol, Timeframe::Week1, weekly);
    }

    pub fn remove(&self, symbol: &str, timeframe: Timeframe) {
        self.answers
            .lock()
            .unwrap()
            .remove(&(Instrument::from(symbol), timeframe));
    }

    pub fn calls(&self) -> Vec<(Instrument, Timeframe)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OscillatorProvider for ScriptedProvider {
    async fn analyze(
        &self,
        instrument: &Instrument,
        timeframe: Timeframe,
    ) -> Result<Analysis, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((instrument.clone(), timeframe));
        self.answers
            .lock()
            .unwrap()
            .get(&(instrument.clone(), timeframe))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("BINANCE:{instrument}")))
    }
}

pub fn macd(signal: Signal, close: f64) -> Analysis {
    Analysis {
        oscillators: BTreeMap::from([(Oscillator::Macd, signal)]),
        close: Some(close),
        change_pct: None,
    }
}

pub fn no_oscillators(close: f64) -> Analysis {
    Analysis {
        oscillators: BTreeMap::new(),
        close: Some(close),
        change_pct: None,
    }
}

pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn signals_dir(&self) -> PathBuf {
        self.path("signals")
    }

    pub fn store_path(&self) -> PathBuf {
        self.path("coins_bought.json")
    }

    pub fn failed_path(&self) -> PathBuf {
        self.path("failed_coins.txt")
    }

    pub fn config(&self, extra: &[&str]) -> BotConfig {
        let signals = self.signals_dir();
        let store = self.store_path();
        let failed = self.failed_path();
        let mut argv: Vec<String> = vec![
            "bot".into(),
            "--signals-dir".into(),
            signals.display().to_string(),
            "--store-path".into(),
            store.display().to_string(),
            "--failed-path".into(),
            failed.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        BotConfig::try_from(Args::parse_from(argv)).unwrap()
    }

    pub fn write_store(&self, json: serde_json::Value) {
        std::fs::write(self.store_path(), serde_json::to_vec_pretty(&json).unwrap()).unwrap();
    }

    pub fn read_store(&self) -> serde_json::Value {
        serde_json::from_slice(&std::fs::read(self.store_path()).unwrap()).unwrap()
    }

    pub fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }
}

pub fn instruments(symbols: &[&str]) -> Vec<Instrument> {
    symbols.iter().map(|s| Instrument::from(*s)).collect()
}
