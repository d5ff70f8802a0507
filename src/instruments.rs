use anyhow::Context;
use std::collections::HashSet;
use std::path::Path;

use crate::types::Instrument;

/// Parse a ticker list: one base asset per line, `quote` appended to each.
///
/// Blank lines and `#` comments are skipped; duplicates keep their first position.
pub fn parse_instruments(text: &str, quote: &str) -> Vec<Instrument> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|base| Instrument(format!("{base}{quote}")))
        .filter(|i| seen.insert(i.clone()))
        .collect()
}

pub fn load_instruments(path: &Path, quote: &str) -> anyhow::Result<Vec<Instrument>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read ticker list {}", path.display()))?;
    Ok(parse_instruments(&text, quote))
}
