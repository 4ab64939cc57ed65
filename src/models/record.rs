//! Meeting document record emitted by both harvesters.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Purpose of a meeting document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Minutes,
    Agenda,
    AgendaPacket,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Minutes => "minutes",
            Category::Agenda => "agenda",
            Category::AgendaPacket => "agenda_packet",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One document associated with one meeting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetingDocumentRecord {
    /// Meeting date, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,

    /// Meeting title
    pub meeting_title: String,

    /// Document category
    pub category: Category,

    /// Absolute URL of the document
    pub url: String,
}

impl MeetingDocumentRecord {
    pub fn new(
        date: NaiveDate,
        meeting_title: impl Into<String>,
        category: Category,
        url: impl Into<String>,
    ) -> Self {
        Self {
            date,
            meeting_title: meeting_title.into(),
            category,
            url: url.into(),
        }
    }

    /// Stable content hash over every field.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.date.format("%Y-%m-%d").to_string());
        hasher.update([0u8]);
        hasher.update(&self.meeting_title);
        hasher.update([0u8]);
        hasher.update(self.category.as_str());
        hasher.update([0u8]);
        hasher.update(&self.url);
        hex::encode(hasher.finalize())
    }
}
