use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::emitter::DecisionEmitter;
use crate::provider::simulated::SimulatedProvider;
use crate::provider::tradingview::{TradingViewProvider, DEFAULT_BASE_URL};
use crate::provider::{Oscillator, OscillatorProvider, ProviderError};
use crate::reconciler::StopLossPolicy;
use crate::types::{Exchange, Screener, Timeframe};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    Tradingview,
    Sim,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Command line / environment options. Parsed once, then frozen into [`BotConfig`].
#[derive(Parser, Debug, Clone)]
#[command(name = "bot", about = "Dual-timeframe oscillator signal bot")]
pub struct Args {
    #[arg(long, env = "SIGNAL_BOT_EXCHANGE", default_value = "BINANCE")]
    pub exchange: String,

    #[arg(long, env = "SIGNAL_BOT_SCREENER", default_value = "crypto")]
    pub screener: String,

    #[arg(long, env = "SIGNAL_BOT_QUOTE_ASSET", default_value = "USDT")]
    pub quote_asset: String,

    /// Oscillators that must agree; repeat or comma-separate.
    #[arg(
        long = "oscillator",
        env = "SIGNAL_BOT_OSCILLATORS",
        value_delimiter = ',',
        default_value = "MACD"
    )]
    pub oscillators: Vec<Oscillator>,

    #[arg(long, env = "SIGNAL_BOT_DAILY_TIMEFRAME", default_value = "1d")]
    pub daily_timeframe: Timeframe,

    #[arg(long, env = "SIGNAL_BOT_WEEKLY_TIMEFRAME", default_value = "1W")]
    pub weekly_timeframe: Timeframe,

    /// Minutes between cycle starts.
    #[arg(long, env = "SIGNAL_BOT_INTERVAL_MINUTES", default_value_t = 1)]
    pub interval_minutes: u64,

    /// Log every reading, not just decisions.
    #[arg(long, env = "SIGNAL_BOT_VERBOSE")]
    pub verbose: bool,

    /// Use the sandbox position store (`test_` prefixed file).
    #[arg(long, env = "SIGNAL_BOT_TEST_MODE")]
    pub test_mode: bool,

    #[arg(long, env = "SIGNAL_BOT_TICKERS", default_value = "allcoins.txt")]
    pub tickers: PathBuf,

    #[arg(long, env = "SIGNAL_BOT_SIGNALS_DIR", default_value = "signals")]
    pub signals_dir: PathBuf,

    #[arg(long, env = "SIGNAL_BOT_STORE_PATH", default_value = "coins_bought.json")]
    pub store_path: PathBuf,

    #[arg(long, env = "SIGNAL_BOT_FAILED_PATH", default_value = "failed_coins.txt")]
    pub failed_path: PathBuf,

    /// Append every cycle's decisions to this JSON-lines file.
    #[arg(long, env = "SIGNAL_BOT_JOURNAL")]
    pub journal: Option<PathBuf>,

    #[arg(long, env = "SIGNAL_BOT_PROVIDER", value_enum, default_value = "tradingview")]
    pub provider: ProviderKind,

    #[arg(long, env = "SIGNAL_BOT_PROVIDER_URL", default_value = DEFAULT_BASE_URL)]
    pub provider_url: String,

    #[arg(long, env = "SIGNAL_BOT_PROVIDER_TIMEOUT_SECS", default_value_t = 10)]
    pub provider_timeout_secs: u64,

    /// Instruments queried in parallel within a cycle.
    #[arg(long, env = "SIGNAL_BOT_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    #[arg(long, env = "SIGNAL_BOT_STOP_LOSS_POLICY", value_enum, default_value = "ratchet")]
    pub stop_loss_policy: StopLossPolicy,

    #[arg(long, env = "SIGNAL_BOT_SIM_SEED")]
    pub sim_seed: Option<u64>,

    /// Run a single cycle and exit.
    #[arg(long)]
    pub once: bool,

    #[arg(long, env = "SIGNAL_BOT_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one oscillator is required")]
    NoOscillators,
    #[error("interval must be at least one minute")]
    ZeroInterval,
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("provider timeout must be at least one second")]
    ZeroTimeout,
    #[error("invalid provider url `{url}`: {reason}")]
    ProviderUrl { url: String, reason: String },
    #[error("store path {0} has no file name")]
    StorePath(PathBuf),
}

/// Immutable runtime configuration shared by every component.
#[derive(Clone, Debug)]
pub struct BotConfig {
    pub exchange: Exchange,
    pub screener: Screener,
    pub quote_asset: String,
    pub oscillators: Vec<Oscillator>,
    pub daily: Timeframe,
    pub weekly: Timeframe,
    pub interval: Duration,
    pub verbose: bool,
    pub test_mode: bool,
    pub tickers: PathBuf,
    pub signals_dir: PathBuf,
    /// Resolved store path (sandbox prefix already applied).
    pub store_path: PathBuf,
    pub failed_path: PathBuf,
    pub journal: Option<PathBuf>,
    pub provider: ProviderKind,
    pub provider_url: Url,
    pub provider_timeout: Duration,
    pub concurrency: usize,
    pub stop_loss_policy: StopLossPolicy,
    pub sim_seed: Option<u64>,
    pub once: bool,
    pub log_format: LogFormat,
}

impl TryFrom<Args> for BotConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mut oscillators = Vec::new();
        for osc in args.oscillators {
            if !oscillators.contains(&osc) {
                oscillators.push(osc);
            }
        }
        if oscillators.is_empty() {
            return Err(ConfigError::NoOscillators);
        }
        if args.interval_minutes == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if args.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if args.provider_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let provider_url = Url::parse(&args.provider_url).map_err(|e| ConfigError::ProviderUrl {
            url: args.provider_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(provider_url.scheme(), "http" | "https") {
            return Err(ConfigError::ProviderUrl {
                url: args.provider_url,
                reason: "scheme must be http or https".into(),
            });
        }

        let store_path = resolve_store_path(&args.store_path, args.test_mode)?;

        Ok(Self {
            exchange: Exchange(args.exchange),
            screener: Screener(args.screener),
            quote_asset: args.quote_asset,
            oscillators,
            daily: args.daily_timeframe,
            weekly: args.weekly_timeframe,
            interval: Duration::from_secs(args.interval_minutes * 60),
            verbose: args.verbose,
            test_mode: args.test_mode,
            tickers: args.tickers,
            signals_dir: args.signals_dir,
            store_path,
            failed_path: args.failed_path,
            journal: args.journal,
            provider: args.provider,
            provider_url,
            provider_timeout: Duration::from_secs(args.provider_timeout_secs),
            concurrency: args.concurrency,
            stop_loss_policy: args.stop_loss_policy,
            sim_seed: args.sim_seed,
            once: args.once,
            log_format: args.log_format,
        })
    }
}

impl BotConfig {
    pub fn emitter(&self) -> DecisionEmitter {
        DecisionEmitter::in_dir(&self.signals_dir)
    }

    pub fn provider(&self) -> Result<Arc<dyn OscillatorProvider>, ProviderError> {
        Ok(match self.provider {
            ProviderKind::Tradingview => Arc::new(TradingViewProvider::new(
                self.provider_url.as_str(),
                self.exchange.clone(),
                self.screener.clone(),
                self.oscillators.clone(),
                self.provider_timeout,
            )?),
            ProviderKind::Sim => Arc::new(SimulatedProvider::new(
                self.oscillators.clone(),
                self.sim_seed,
            )),
        })
    }
}

/// Sandbox runs use `test_<name>` next to the live file so the two never mix.
fn resolve_store_path(path: &Path, test_mode: bool) -> Result<PathBuf, ConfigError> {
    if !test_mode {
        return Ok(path.to_path_buf());
    }
    let name = path
        .file_name()
        .ok_or_else(|| ConfigError::StorePath(path.to_path_buf()))?;
    let mut prefixed = std::ffi::OsString::from("test_");
    prefixed.push(name);
    Ok(path.with_file_name(prefixed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(extra: &[&str]) -> Result<BotConfig, ConfigError> {
        let mut argv = vec!["bot"];
        argv.extend_from_slice(extra);
        BotConfig::try_from(Args::parse_from(argv))
    }

    #[test]
    fn defaults_mirror_long_hold_setup() {
        let cfg = parse(&[]).unwrap();
        assert_eq!(cfg.exchange, Exchange("BINANCE".into()));
        assert_eq!(cfg.quote_asset, "USDT");
        assert_eq!(cfg.oscillators, vec![Oscillator::Macd]);
        assert_eq!(cfg.daily, Timeframe::Day1);
        assert_eq!(cfg.weekly, Timeframe::Week1);
        assert_eq!(cfg.interval, Duration::from_secs(60));
        assert_eq!(cfg.store_path, PathBuf::from("coins_bought.json"));
        assert_eq!(cfg.stop_loss_policy, StopLossPolicy::Ratchet);
        assert_eq!(cfg.concurrency, 1);
    }

    #[test]
    fn test_mode_selects_sandbox_store() {
        let cfg = parse(&["--test-mode", "--store-path", "state/coins_bought.json"]).unwrap();
        assert_eq!(cfg.store_path, PathBuf::from("state/test_coins_bought.json"));
    }

    #[test]
    fn oscillators_are_deduplicated() {
        let cfg = parse(&["--oscillator", "MACD,rsi", "--oscillator", "macd"]).unwrap();
        assert_eq!(cfg.oscillators, vec![Oscillator::Macd, Oscillator::Rsi]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(parse(&["--interval-minutes", "0"]), Err(ConfigError::ZeroInterval)));
        assert!(matches!(parse(&["--concurrency", "0"]), Err(ConfigError::ZeroConcurrency)));
        assert!(matches!(
            parse(&["--provider-url", "ftp://example.com"]),
            Err(ConfigError::ProviderUrl { .. })
        ));
        assert!(Args::try_parse_from(["bot", "--oscillator", "AO"]).is_err());
        assert!(Args::try_parse_from(["bot", "--weekly-timeframe", "3d"]).is_err());
    }
}
