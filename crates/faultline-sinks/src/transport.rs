//! Envelope transports
//!
//! - [`OutboxTransport`] writes one pretty-printed JSON file per envelope into
//!   a directory and can list, read and delete them again.
//! - [`MemoryTransport`] keeps envelopes in memory, for tests and dry runs.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
};

use chrono::Utc;
use faultline_core::ports::{Envelope, Transport};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport is closed")]
    Closed,
}

// ============================================================================
// OutboxTransport
// ============================================================================

/// Entry in the outbox directory.
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    /// Envelope id (32 hex digits)
    pub id: String,
    /// `event` or `log`
    pub kind: String,
    /// `YYYYmmddHHMMSS` of the write
    pub date: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Writes envelopes to `{kind}-{date}-{id}.json` files.
pub struct OutboxTransport {
    dir: PathBuf,
    closed: AtomicBool,
}

impl OutboxTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the default outbox directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("faultline")
            .join("outbox")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `envelope` and returns the file path.
    pub fn write(&self, envelope: &Envelope) -> Result<PathBuf, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        std::fs::create_dir_all(&self.dir)?;

        let date = Utc::now().format("%Y%m%d%H%M%S");
        let filename = format!("{}-{date}-{}.json", envelope.kind(), envelope.id());
        let path = self.dir.join(filename);

        let json = serde_json::to_string_pretty(envelope)?;
        std::fs::write(&path, json)?;

        debug!(path = %path.display(), kind = envelope.kind(), "Envelope written to outbox");
        Ok(path)
    }

    /// Lists all envelope files, newest first.
    pub fn list(&self) -> Result<Vec<OutboxEntry>, TransportError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|e| e == "json") {
                let stem = path
                    .file_stem()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string();

                let (kind, date, id) = parse_envelope_filename(&stem);
                let metadata = entry.metadata()?;

                entries.push(OutboxEntry {
                    id,
                    kind,
                    date,
                    size_bytes: metadata.len(),
                    path,
                });
            }
        }

        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    /// Reads the envelope whose id starts with `id`.
    pub fn read(&self, id: &str) -> Result<Option<Envelope>, TransportError> {
        match self.find(id)? {
            Some(entry) => {
                let content = std::fs::read_to_string(&entry.path)?;
                Ok(Some(serde_json::from_str(&content)?))
            }
            None => Ok(None),
        }
    }

    /// Deletes the envelope whose id starts with `id`.
    pub fn delete(&self, id: &str) -> Result<bool, TransportError> {
        match self.find(id)? {
            Some(entry) => {
                std::fs::remove_file(&entry.path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deletes every envelope. Returns how many were removed.
    pub fn delete_all(&self) -> Result<u32, TransportError> {
        let mut count = 0;
        for entry in self.list()? {
            if std::fs::remove_file(&entry.path).is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn find(&self, id: &str) -> Result<Option<OutboxEntry>, TransportError> {
        if id.is_empty() {
            return Ok(None);
        }
        Ok(self.list()?.into_iter().find(|e| e.id.starts_with(id)))
    }
}

impl Transport for OutboxTransport {
    fn send(&self, envelope: &Envelope) -> anyhow::Result<()> {
        self.write(envelope)?;
        Ok(())
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Parses `event-20261016120000-<id>` into (kind, date, id).
fn parse_envelope_filename(stem: &str) -> (String, String, String) {
    let parts: Vec<&str> = stem.splitn(3, '-').collect();
    match parts.len() {
        3 => (
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
        ),
        2 => (parts[0].to_string(), parts[1].to_string(), stem.to_string()),
        _ => ("unknown".to_string(), String::new(), stem.to_string()),
    }
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// Keeps envelopes in memory.
#[derive(Default)]
pub struct MemoryTransport {
    envelopes: Mutex<Vec<Envelope>>,
    failing: AtomicBool,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following send fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events sent so far, in order.
    pub fn events(&self) -> Vec<faultline_core::domain::DiagnosticEvent> {
        self.envelopes()
            .iter()
            .filter_map(|e| e.event().cloned())
            .collect()
    }

    /// Log records sent so far, in order.
    pub fn logs(&self) -> Vec<faultline_core::domain::LogRecord> {
        self.envelopes()
            .iter()
            .filter_map(|e| e.log_record().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, envelope: &Envelope) -> anyhow::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed.into());
        }
        if self.failing.load(Ordering::Acquire) {
            anyhow::bail!("simulated transport failure");
        }
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());
        Ok(())
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
