use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::store::PositionStore;
use crate::types::Instrument;

/// How a protective stop may move once set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StopLossPolicy {
    /// Only ever raise the stop of a long position.
    #[default]
    Ratchet,
    /// Replace the stop with every new candidate.
    Overwrite,
}

impl StopLossPolicy {
    fn accepts(self, current: Option<f64>, candidate: f64) -> bool {
        match (self, current) {
            (StopLossPolicy::Overwrite, _) | (_, None) => true,
            (StopLossPolicy::Ratchet, Some(cur)) => candidate > cur,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileReport {
    pub stops_applied: Vec<Instrument>,
    /// Candidates refused because they would loosen the stop.
    pub stops_held: Vec<Instrument>,
    pub marked_for_sell: Vec<Instrument>,
    /// Decisions for instruments with no open position.
    pub not_held: Vec<Instrument>,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        !self.stops_applied.is_empty() || !self.marked_for_sell.is_empty()
    }
}

/// Merge a cycle's exit decisions into the store.
///
/// Only existing records are touched; positions are opened by the executor.
/// Applying the same decisions twice leaves the store unchanged the second time.
pub fn reconcile(
    store: &mut PositionStore,
    sell_decisions: &BTreeMap<Instrument, Option<f64>>,
    stop_loss_decisions: &BTreeMap<Instrument, f64>,
    policy: StopLossPolicy,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for (instrument, &stop) in stop_loss_decisions {
        let Some(record) = store.get_mut(instrument) else {
            report.not_held.push(instrument.clone());
            continue;
        };
        if policy.accepts(record.stop_loss, stop) {
            if record.stop_loss != Some(stop) {
                info!(%instrument, from = ?record.stop_loss, to = stop, "stop loss moved");
            }
            record.stop_loss = Some(stop);
            report.stops_applied.push(instrument.clone());
        } else {
            debug!(%instrument, current = ?record.stop_loss, candidate = stop, "stop loss held");
            report.stops_held.push(instrument.clone());
        }
    }

    for (instrument, stop) in sell_decisions {
        let Some(record) = store.get_mut(instrument) else {
            report.not_held.push(instrument.clone());
            continue;
        };
        record.marked_for_sell = true;
        if let Some(stop) = stop {
            record.stop_loss = Some(*stop);
        }
        info!(%instrument, stop_loss = ?record.stop_loss, "position marked for sell");
        report.marked_for_sell.push(instrument.clone());
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PositionRecord;
    use pretty_assertions::assert_eq;

    fn inst(s: &str) -> Instrument {
        Instrument::from(s)
    }

    fn held(pairs: &[(&str, Option<f64>)]) -> PositionStore {
        let mut store = PositionStore::new();
        for (sym, stop) in pairs {
            store.insert(
                inst(sym),
                PositionRecord {
                    stop_loss: *stop,
                    ..Default::default()
                },
            );
        }
        store
    }

    #[test]
    fn stop_set_on_held_position() {
        let mut store = held(&[("ETHUSDT", None)]);
        let stops = BTreeMap::from([(inst("ETHUSDT"), 3000.0)]);
        let report = reconcile(&mut store, &BTreeMap::new(), &stops, StopLossPolicy::Ratchet);
        assert_eq!(store.get(&inst("ETHUSDT")).unwrap().stop_loss, Some(3000.0));
        assert_eq!(report.stops_applied, vec![inst("ETHUSDT")]);
    }

    #[test]
    fn ratchet_refuses_lower_stop_overwrite_accepts() {
        let stops = BTreeMap::from([(inst("ETHUSDT"), 2800.0)]);

        let mut store = held(&[("ETHUSDT", Some(3000.0))]);
        let report = reconcile(&mut store, &BTreeMap::new(), &stops, StopLossPolicy::Ratchet);
        assert_eq!(store.get(&inst("ETHUSDT")).unwrap().stop_loss, Some(3000.0));
        assert_eq!(report.stops_held, vec![inst("ETHUSDT")]);

        let mut store = held(&[("ETHUSDT", Some(3000.0))]);
        reconcile(&mut store, &BTreeMap::new(), &stops, StopLossPolicy::Overwrite);
        assert_eq!(store.get(&inst("ETHUSDT")).unwrap().stop_loss, Some(2800.0));
    }

    #[test]
    fn sell_marks_and_sets_stop() {
        let mut store = held(&[("XRPUSDT", Some(0.4))]);
        let sells = BTreeMap::from([(inst("XRPUSDT"), Some(0.52))]);
        let report = reconcile(&mut store, &sells, &BTreeMap::new(), StopLossPolicy::Ratchet);
        let xrp = store.get(&inst("XRPUSDT")).unwrap();
        assert!(xrp.marked_for_sell);
        assert_eq!(xrp.stop_loss, Some(0.52));
        assert!(report.changed());
    }

    #[test]
    fn sell_without_price_keeps_stop() {
        let mut store = held(&[("XRPUSDT", Some(0.4))]);
        let sells = BTreeMap::from([(inst("XRPUSDT"), None)]);
        reconcile(&mut store, &sells, &BTreeMap::new(), StopLossPolicy::Ratchet);
        let xrp = store.get(&inst("XRPUSDT")).unwrap();
        assert!(xrp.marked_for_sell);
        assert_eq!(xrp.stop_loss, Some(0.4));
    }

    #[test]
    fn unknown_instruments_are_not_created() {
        let mut store = held(&[]);
        let sells = BTreeMap::from([(inst("XRPUSDT"), Some(0.5))]);
        let stops = BTreeMap::from([(inst("ETHUSDT"), 3000.0)]);
        let report = reconcile(&mut store, &sells, &stops, StopLossPolicy::Overwrite);
        assert!(store.is_empty());
        assert_eq!(report.not_held.len(), 2);
        assert!(!report.changed());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let sells = BTreeMap::from([(inst("XRPUSDT"), Some(0.5))]);
        let stops = BTreeMap::from([(inst("ETHUSDT"), 3000.0)]);
        for policy in [StopLossPolicy::Ratchet, StopLossPolicy::Overwrite] {
            let mut store = held(&[("ETHUSDT", None), ("XRPUSDT", None), ("BTCUSDT", Some(1.0))]);
            reconcile(&mut store, &sells, &stops, policy);
            let once = store.to_bytes().unwrap();
            reconcile(&mut store, &sells, &stops, policy);
            assert_eq!(store.to_bytes().unwrap(), once);
        }
    }
}
