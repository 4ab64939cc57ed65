//! Local filesystem storage implementation.
//!
//! Buffers records during a run and merges them into a single JSON
//! document store when the run finishes. Records already present (same
//! fingerprint) are not stored twice.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── documents.json        # { updated_at, count, records: [...] }
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::MeetingDocumentRecord;
use crate::storage::{RecordSink, SinkSummary};

/// On-disk shape of the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocuments {
    /// Timestamp of the last write
    pub updated_at: DateTime<Utc>,
    /// Total record count
    pub count: usize,
    /// Records sorted by date descending
    pub records: Vec<MeetingDocumentRecord>,
}

impl StoredDocuments {
    pub fn new(records: Vec<MeetingDocumentRecord>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: records.len(),
            records,
        }
    }
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    file_name: String,
    pending: Mutex<Vec<MeetingDocumentRecord>>,
}

impl LocalStorage {
    /// Create a LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            file_name: file_name.into(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Full path of the document store.
    pub fn documents_path(&self) -> PathBuf {
        self.root_dir.join(&self.file_name)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let path = self.documents_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Load the current document store, `None` if nothing was written yet.
    pub async fn load(&self) -> Result<Option<StoredDocuments>> {
        match tokio::fs::read(self.documents_path()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn take_pending(&self) -> Result<Vec<MeetingDocumentRecord>> {
        let mut pending = self.pending.lock().map_err(AppError::sink)?;
        Ok(std::mem::take(&mut *pending))
    }
}

#[async_trait]
impl RecordSink for LocalStorage {
    async fn emit(&self, record: MeetingDocumentRecord) -> Result<()> {
        self.pending
            .lock()
            .map_err(AppError::sink)?
            .push(record);
        Ok(())
    }

    async fn finish(&self) -> Result<SinkSummary> {
        let incoming = self.take_pending()?;
        let received = incoming.len();

        let mut records = self
            .load()
            .await?
            .map(|stored| stored.records)
            .unwrap_or_default();
        let before = records.len();

        let mut seen: HashSet<String> = records.iter().map(|r| r.fingerprint()).collect();
        for record in incoming {
            if seen.insert(record.fingerprint()) {
                records.push(record);
            }
        }
        let added = records.len() - before;

        // Newest first, then stable by title and URL
        records.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.meeting_title.cmp(&b.meeting_title))
                .then_with(|| a.url.cmp(&b.url))
        });

        let stored = StoredDocuments::new(records);
        let bytes = serde_json::to_vec_pretty(&stored)?;
        self.write_bytes(&bytes).await?;

        let location = self.documents_path().display().to_string();
        log::info!(
            "Stored {} records ({} new) in {}",
            stored.count,
            added,
            location
        );

        Ok(SinkSummary {
            received,
            added,
            total: stored.count,
            location,
            timestamp: stored.updated_at,
        })
    }
}
