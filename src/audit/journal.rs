use crate::audit::{AuditEvent, AuditSink};
use anyhow::Context;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSON-lines journal of decisions and failures.
///
/// Unlike the signal artifacts, which only ever hold the latest cycle, the
/// journal keeps the full history.
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create journal dir {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open journal {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn emit(&self, event: AuditEvent) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(&event).context("serialize journal event")?;
        line.push(b'\n');
        let mut f = self.file.lock();
        f.write_all(&line)
            .with_context(|| format!("append journal {}", self.path.display()))?;
        Ok(())
    }
}
