use anyhow::Context;
use clap::Parser;
use signal_decision_bot::audit::journal::JsonlAuditSink;
use signal_decision_bot::audit::{AuditSink, NoopAuditSink};
use signal_decision_bot::config::{Args, BotConfig, LogFormat};
use signal_decision_bot::instruments::load_instruments;
use signal_decision_bot::scheduler::Scheduler;
use signal_decision_bot::SignalEngine;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn init_tracing(cfg: &BotConfig) {
    let default = if cfg.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    match cfg.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = BotConfig::try_from(Args::parse())?;
    init_tracing(&cfg);

    let instruments = load_instruments(&cfg.tickers, &cfg.quote_asset)?;
    tracing::info!(
        instruments = instruments.len(),
        exchange = %cfg.exchange.0,
        screener = %cfg.screener.0,
        oscillators = ?cfg.oscillators,
        store = %cfg.store_path.display(),
        test_mode = cfg.test_mode,
        "signal bot starting"
    );

    let provider = cfg.provider().context("build provider")?;
    let audit: Arc<dyn AuditSink> = match &cfg.journal {
        Some(path) => Arc::new(JsonlAuditSink::open(path)?),
        None => Arc::new(NoopAuditSink),
    };

    let mut scheduler = Scheduler::new(cfg.interval);
    if cfg.once {
        scheduler = scheduler.with_max_cycles(1);
    }
    let engine = SignalEngine::new(cfg, provider, audit);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown requested, finishing current cycle");
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(&engine, &instruments, shutdown_rx).await;

    let snapshot = engine.metrics().snapshot_kv();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
