//! Line-oriented artifacts read by the executor.
//!
//! Each file holds one symbol per line. All three decision files are replaced
//! every cycle, including the ones with nothing to say, so a decision never
//! outlives the cycle that produced it.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::fsutil::{lines, write_atomic};
use crate::types::{Category, Instrument};

pub const BUY_ARTIFACT: &str = "signalmacd.exs";
pub const SELL_ARTIFACT: &str = "signalmacd_sell.exs";
pub const STOP_LOSS_ARTIFACT: &str = "signalmacd_sl.exs";

#[derive(Debug, thiserror::Error)]
#[error("write {path}: {source}")]
pub struct EmitError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionEmitter {
    buy: PathBuf,
    sell: PathBuf,
    stop_loss: PathBuf,
}

impl DecisionEmitter {
    pub fn new(buy: PathBuf, sell: PathBuf, stop_loss: PathBuf) -> Self {
        Self {
            buy,
            sell,
            stop_loss,
        }
    }

    /// Standard file names under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join(BUY_ARTIFACT),
            dir.join(SELL_ARTIFACT),
            dir.join(STOP_LOSS_ARTIFACT),
        )
    }

    pub fn path(&self, category: Category) -> &Path {
        match category {
            Category::Buy => &self.buy,
            Category::Sell => &self.sell,
            Category::SetStopLoss => &self.stop_loss,
        }
    }

    /// Rewrite every category artifact once. Categories absent from the map are
    /// written empty.
    pub fn emit(&self, by_category: &BTreeMap<Category, Vec<Instrument>>) -> Result<(), EmitError> {
        for category in Category::ALL {
            let symbols = by_category
                .get(&category)
                .map(Vec::as_slice)
                .unwrap_or_default();
            write_lines(self.path(category), symbols)?;
        }
        Ok(())
    }

    /// Empty every artifact. All three are attempted even if one fails; the
    /// first error is returned.
    pub fn clear(&self) -> Result<(), EmitError> {
        let mut first_err = None;
        for category in Category::ALL {
            if let Err(e) = write_lines(self.path(category), &[]) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Replace `path` with one symbol per line.
pub fn write_lines(path: &Path, instruments: &[Instrument]) -> Result<(), EmitError> {
    let body = lines(instruments.iter().map(Instrument::as_str));
    write_atomic(path, body.as_bytes()).map_err(|source| EmitError {
        path: path.to_path_buf(),
        source,
    })
}
