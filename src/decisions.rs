use std::collections::BTreeMap;

use crate::types::{Category, Decision, Instrument};

/// Decisions of one cycle, in instrument-list order, at most one per instrument.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecisionSet {
    entries: Vec<(Instrument, Decision)>,
}

impl DecisionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `decision`, replacing any earlier decision for the same instrument.
    pub fn insert(&mut self, instrument: Instrument, decision: Decision) {
        if let Some(slot) = self.entries.iter_mut().find(|(i, _)| *i == instrument) {
            slot.1 = decision;
        } else {
            self.entries.push((instrument, decision));
        }
    }

    pub fn get(&self, instrument: &Instrument) -> Option<&Decision> {
        self.entries
            .iter()
            .find(|(i, _)| i == instrument)
            .map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Instrument, Decision)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every category is present, possibly with no instruments.
    pub fn by_category(&self) -> BTreeMap<Category, Vec<Instrument>> {
        let mut out: BTreeMap<Category, Vec<Instrument>> =
            Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
        for (instrument, decision) in &self.entries {
            out.entry(decision.category())
                .or_default()
                .push(instrument.clone());
        }
        out
    }

    pub fn sell_decisions(&self) -> BTreeMap<Instrument, Option<f64>> {
        self.entries
            .iter()
            .filter_map(|(i, d)| match d {
                Decision::Sell { stop_price } => Some((i.clone(), *stop_price)),
                _ => None,
            })
            .collect()
    }

    pub fn stop_loss_decisions(&self) -> BTreeMap<Instrument, f64> {
        self.entries
            .iter()
            .filter_map(|(i, d)| match d {
                Decision::SetStopLoss { stop_price } => Some((i.clone(), *stop_price)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, category: Category) -> usize {
        self.entries
            .iter()
            .filter(|(_, d)| d.category() == category)
            .count()
    }
}
