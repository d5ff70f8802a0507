//! Durable position records shared with the executor.
//!
//! The document is a JSON object keyed by symbol. The executor creates entries
//! when it buys; this crate only updates `stop_loss` and `marked_for_sell` and
//! carries every other field through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::fsutil::write_atomic;
use crate::types::Instrument;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("position store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("position store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialize position store: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub marked_for_sell: bool,
    /// Executor-owned fields (order id, volume, entry price, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionStore {
    records: BTreeMap<Instrument, PositionRecord>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing or zero-length file reads as an empty store. Anything else that
    /// does not parse is [`StoreError::Corrupt`]; it is never silently emptied.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Atomically replace the document at `path`. Returns the content digest.
    pub fn save(&self, path: &Path) -> Result<String, StoreError> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(digest(&bytes))
    }

    /// Canonical serialization: two-space indent, keys sorted.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn digest(&self) -> Result<String, StoreError> {
        Ok(digest(&self.to_bytes()?))
    }

    pub fn get(&self, instrument: &Instrument) -> Option<&PositionRecord> {
        self.records.get(instrument)
    }

    pub fn get_mut(&mut self, instrument: &Instrument) -> Option<&mut PositionRecord> {
        self.records.get_mut(instrument)
    }

    pub fn insert(&mut self, instrument: Instrument, record: PositionRecord) {
        self.records.insert(instrument, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Instrument, &PositionRecord)> {
        self.records.iter()
    }
}

fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
