use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Decision, Instrument, Timeframe};

/// One line of the decision history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    Decision {
        ts: DateTime<Utc>,
        cycle: u64,
        instrument: Instrument,
        decision: Decision,
    },
    ProviderFailure {
        ts: DateTime<Utc>,
        cycle: u64,
        instrument: Instrument,
        timeframe: Timeframe,
        error: String,
    },
    CycleCompleted {
        ts: DateTime<Utc>,
        cycle: u64,
        evaluated: usize,
        decisions: usize,
        failed: usize,
        store_digest: String,
    },
    CycleAborted {
        ts: DateTime<Utc>,
        cycle: u64,
        error: String,
    },
}

impl AuditEvent {
    pub fn decision(cycle: u64, instrument: Instrument, decision: Decision) -> Self {
        Self::Decision {
            ts: Utc::now(),
            cycle,
            instrument,
            decision,
        }
    }

    pub fn provider_failure(
        cycle: u64,
        instrument: Instrument,
        timeframe: Timeframe,
        error: String,
    ) -> Self {
        Self::ProviderFailure {
            ts: Utc::now(),
            cycle,
            instrument,
            timeframe,
            error,
        }
    }

    pub fn cycle_completed(
        cycle: u64,
        evaluated: usize,
        decisions: usize,
        failed: usize,
        store_digest: String,
    ) -> Self {
        Self::CycleCompleted {
            ts: Utc::now(),
            cycle,
            evaluated,
            decisions,
            failed,
            store_digest,
        }
    }

    pub fn cycle_aborted(cycle: u64, error: String) -> Self {
        Self::CycleAborted {
            ts: Utc::now(),
            cycle,
            error,
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent) -> anyhow::Result<()>;
}

pub mod journal;

/// No-op audit sink (used when no journal is configured).
#[derive(Clone, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Keeps events in memory; handy for inspecting what a cycle recorded.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: parking_lot::Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) -> anyhow::Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}
