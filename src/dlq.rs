//! Dead-letter queue for requests that could not be processed.
//!
//! Entries are buffered in memory and flushed as NDJSON to a configured
//! directory, one file per run with a timestamp suffix. The queue is a
//! shared append-only sink: concurrent senders serialize on the buffer
//! mutex, and at-least-once delivery is acceptable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// How many records to buffer before flushing to disk.
const FLUSH_THRESHOLD: usize = 100;

/// Why an entry was dead-lettered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterKind {
    /// Failure classified as terminal; never retried.
    Terminal,
    /// Transient failure that outlived the retry budget.
    RetriesExhausted,
    /// Recorded directly by the failure-injection endpoint.
    Manual,
}

impl DeadLetterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::RetriesExhausted => "retries_exhausted",
            Self::Manual => "manual",
        }
    }
}

/// A record of a request that exhausted its processing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    /// Original request payload, preserved verbatim.
    pub payload: serde_json::Value,
    /// Error message from the final attempt.
    pub reason: String,
    pub kind: DeadLetterKind,
    /// Attempts made before giving up. Terminal failures record 1.
    pub attempts: u32,
    pub first_failure_at: DateTime<Utc>,
}

/// Counts of dead-lettered entries by kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureStats {
    pub terminal: usize,
    pub retries_exhausted: usize,
    pub manual: usize,
}

impl FailureStats {
    fn increment(&mut self, kind: DeadLetterKind) {
        match kind {
            DeadLetterKind::Terminal => self.terminal += 1,
            DeadLetterKind::RetriesExhausted => self.retries_exhausted += 1,
            DeadLetterKind::Manual => self.manual += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.terminal + self.retries_exhausted + self.manual
    }
}

/// Errors from dead-letter queue IO.
#[derive(Debug, Error)]
pub enum DlqError {
    #[error("Failed to create DLQ directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize DLQ record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write DLQ file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Append-only sink for failed requests.
///
/// Each run writes to its own file, so flushes append within a run without
/// clobbering earlier runs.
pub struct DeadLetterQueue {
    path: PathBuf,
    buffer: Mutex<Vec<DeadLetterEntry>>,
    stats: Mutex<FailureStats>,
}

impl DeadLetterQueue {
    /// Create a queue writing under `dir`.
    ///
    /// Returns `None` when no directory is configured, which disables
    /// dead-lettering entirely.
    pub fn from_config(dir: Option<&PathBuf>) -> Result<Option<Self>, DlqError> {
        let Some(dir) = dir else {
            return Ok(None);
        };

        std::fs::create_dir_all(dir).map_err(|source| DlqError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("failures-{timestamp}.ndjson"));

        info!("DLQ enabled: {}", path.display());

        Ok(Some(Self {
            path,
            buffer: Mutex::new(Vec::new()),
            stats: Mutex::new(FailureStats::default()),
        }))
    }

    /// Record a dead-lettered request.
    ///
    /// Buffered; flushed once the buffer fills or on [`finalize`].
    /// A flush failure is logged rather than surfaced, so a broken sink
    /// never takes the request path down with it.
    ///
    /// [`finalize`]: Self::finalize
    pub async fn record(&self, entry: DeadLetterEntry) {
        debug!(
            kind = entry.kind.as_str(),
            attempts = entry.attempts,
            "Recording dead-letter entry"
        );

        {
            let mut stats = self.stats.lock().await;
            stats.increment(entry.kind);
        }

        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(entry);
            buffer.len() >= FLUSH_THRESHOLD
        };

        if should_flush {
            if let Err(e) = self.flush().await {
                error!("Failed to flush DLQ: {}", e);
            }
        }
    }

    /// Flush buffered records to the run file as NDJSON.
    pub async fn flush(&self) -> Result<(), DlqError> {
        let records = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *buffer)
        };

        let count = records.len();
        let mut ndjson = String::new();
        for record in &records {
            ndjson.push_str(&serde_json::to_string(record)?);
            ndjson.push('\n');
        }

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| DlqError::Write {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(ndjson.as_bytes())
            .map_err(|source| DlqError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!("Flushed {} records to DLQ", count);
        Ok(())
    }

    /// Flush remaining records and log final statistics.
    pub async fn finalize(&self) -> Result<(), DlqError> {
        self.flush().await?;
        let stats = self.stats.lock().await;
        info!(
            "DLQ finalized: {} total failures (terminal={}, retries_exhausted={}, manual={})",
            stats.total(),
            stats.terminal,
            stats.retries_exhausted,
            stats.manual
        );
        Ok(())
    }

    /// Snapshot of failure counts.
    pub async fn stats(&self) -> FailureStats {
        *self.stats.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(kind: DeadLetterKind, attempts: u32) -> DeadLetterEntry {
        DeadLetterEntry {
            payload: json!({"title": "doomed"}),
            reason: "downstream unavailable".to_string(),
            kind,
            attempts,
            first_failure_at: Utc::now(),
        }
    }

    #[test]
    fn disabled_without_directory() {
        let dlq = DeadLetterQueue::from_config(None).unwrap();
        assert!(dlq.is_none());
    }

    #[tokio::test]
    async fn records_flush_as_ndjson() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let dlq = DeadLetterQueue::from_config(Some(&dir)).unwrap().unwrap();

        dlq.record(entry(DeadLetterKind::Terminal, 1)).await;
        dlq.record(entry(DeadLetterKind::RetriesExhausted, 4)).await;
        dlq.finalize().await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);

        let content = std::fs::read_to_string(entries[0].path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in lines {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(record.get("payload").is_some());
            assert!(record.get("reason").is_some());
            assert!(record.get("kind").is_some());
            assert!(record.get("first_failure_at").is_some());
        }
    }

    #[tokio::test]
    async fn repeated_flushes_append_within_a_run() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let dlq = DeadLetterQueue::from_config(Some(&dir)).unwrap().unwrap();

        dlq.record(entry(DeadLetterKind::Manual, 0)).await;
        dlq.flush().await.unwrap();
        dlq.record(entry(DeadLetterKind::Manual, 0)).await;
        dlq.finalize().await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);
        let content = std::fs::read_to_string(entries[0].path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn stats_count_by_kind() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        let dlq = DeadLetterQueue::from_config(Some(&dir)).unwrap().unwrap();

        dlq.record(entry(DeadLetterKind::Terminal, 1)).await;
        dlq.record(entry(DeadLetterKind::Terminal, 1)).await;
        dlq.record(entry(DeadLetterKind::RetriesExhausted, 3)).await;

        let stats = dlq.stats().await;
        assert_eq!(stats.terminal, 2);
        assert_eq!(stats.retries_exhausted, 1);
        assert_eq!(stats.total(), 3);
    }
}
