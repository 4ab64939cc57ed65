//! Record sinks.
//!
//! Harvesters hand every record to a [`RecordSink`] as soon as it is
//! produced. Durability and cross-run dedup are the sink's job.
//!
//! - [`MemorySink`]: collects records in memory
//! - [`LocalStorage`]: JSON document store on the local filesystem
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Harvester configuration
//! └── documents.json        # Stored meeting document records
//! ```

pub mod local;

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::MeetingDocumentRecord;

// Re-export for convenience
pub use local::{LocalStorage, StoredDocuments};

/// Metadata about a completed sink flush.
#[derive(Debug, Clone)]
pub struct SinkSummary {
    /// Records received during this run
    pub received: usize,
    /// Records that were not already stored
    pub added: usize,
    /// Records held by the sink after the flush
    pub total: usize,
    /// Where the records ended up
    pub location: String,
    pub timestamp: DateTime<Utc>,
}

/// Destination for harvested records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Accept one record.
    async fn emit(&self, record: MeetingDocumentRecord) -> Result<()>;

    /// Flush buffered records at the end of a run.
    async fn finish(&self) -> Result<SinkSummary>;
}

/// Emit a record, logging sink failures.
///
/// Failures are returned only when `strict` is set.
pub async fn emit_record(
    sink: &dyn RecordSink,
    record: MeetingDocumentRecord,
    strict: bool,
) -> Result<()> {
    let url = record.url.clone();
    match sink.emit(record).await {
        Ok(()) => Ok(()),
        Err(error) => {
            log::error!("Sink rejected record for {}: {}", url, error);
            if strict { Err(error) } else { Ok(()) }
        }
    }
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<MeetingDocumentRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far, in emission order.
    pub fn records(&self) -> Vec<MeetingDocumentRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn emit(&self, record: MeetingDocumentRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(AppError::sink)?
            .push(record);
        Ok(())
    }

    async fn finish(&self) -> Result<SinkSummary> {
        let count = self.records().len();
        Ok(SinkSummary {
            received: count,
            added: count,
            total: count,
            location: "memory".to_string(),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Category;

    struct RejectingSink;

    #[async_trait]
    impl RecordSink for RejectingSink {
        async fn emit(&self, _record: MeetingDocumentRecord) -> Result<()> {
            Err(AppError::sink("disk full"))
        }

        async fn finish(&self) -> Result<SinkSummary> {
            Err(AppError::sink("disk full"))
        }
    }

    fn record() -> MeetingDocumentRecord {
        MeetingDocumentRecord::new(
            NaiveDate::from_ymd_opt(2023, 3, 3).unwrap(),
            "Board Meeting",
            Category::Minutes,
            "https://docs.example.com/PdfPop.aspx?docid=1",
        )
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        let mut second = record();
        second.meeting_title = "Board Workshop".to_string();

        sink.emit(record()).await.unwrap();
        sink.emit(second.clone()).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], second);
        assert_eq!(sink.finish().await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_emit_record_swallows_errors_unless_strict() {
        assert!(emit_record(&RejectingSink, record(), false).await.is_ok());
        assert!(matches!(
            emit_record(&RejectingSink, record(), true).await,
            Err(AppError::Sink(_))
        ));
    }
}
