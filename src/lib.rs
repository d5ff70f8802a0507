//! Dual-timeframe oscillator signal bot.
//!
//! Every cycle each instrument's daily and weekly oscillator readings are
//! fetched from an analytics provider and classified into buy, sell or
//! set-stop-loss decisions. Exit decisions are merged into the executor's
//! position store and all decisions are published as per-category signal files.

pub mod audit;
pub mod classifier;
pub mod config;
pub mod cycle;
pub mod decisions;
pub mod emitter;
pub mod fsutil;
pub mod instruments;
pub mod metrics;
pub mod provider;
pub mod reconciler;
pub mod scheduler;
pub mod store;
pub mod types;

pub use crate::cycle::{CycleError, CycleReport, SignalEngine};
pub use crate::metrics::MetricsEngine;
