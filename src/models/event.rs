//! Wire types for the paginated events API.
//!
//! Pages keep their entries as raw JSON so that each event, and each file of
//! an event, is decoded on its own. A malformed entry only loses itself.

use serde::Deserialize;
use serde_json::Value;

/// One page of the events API response.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventPage {
    /// Raw event entries on this page
    #[serde(default)]
    pub value: Option<Vec<Value>>,

    /// Continuation reference for the next page
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

impl EventPage {
    /// Parse a page body.
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    pub fn entries(&self) -> &[Value] {
        self.value.as_deref().unwrap_or_default()
    }

    /// Decode every entry independently.
    pub fn events(&self) -> impl Iterator<Item = serde_json::Result<EventRecord>> + '_ {
        self.entries().iter().map(EventRecord::deserialize)
    }

    /// Continuation reference, ignoring blank values.
    pub fn continuation(&self) -> Option<&str> {
        self.next_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }
}

/// A meeting event as returned by the API.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default)]
    pub id: Option<RawId>,

    #[serde(default)]
    pub event_name: Option<String>,

    #[serde(default)]
    pub start_date_time: Option<String>,

    /// Raw file entries, decoded one by one through [`EventRecord::files`]
    #[serde(default)]
    pub published_files: Option<Vec<Value>>,
}

impl EventRecord {
    /// Event identifier, `None` when absent or zero.
    pub fn event_id(&self) -> Option<String> {
        self.id.as_ref().and_then(RawId::normalized)
    }

    /// Start timestamp, `None` when absent or blank.
    pub fn start(&self) -> Option<&str> {
        self.start_date_time
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    pub fn file_entries(&self) -> &[Value] {
        self.published_files.as_deref().unwrap_or_default()
    }

    /// Decode every published file independently.
    pub fn files(&self) -> impl Iterator<Item = serde_json::Result<FileRecord>> + '_ {
        self.file_entries().iter().map(FileRecord::deserialize)
    }
}

/// A published file attached to an event.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(default)]
    pub file_id: Option<RawId>,

    /// Free-text classification hint (e.g. "Agenda Packet")
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
}

impl FileRecord {
    /// File identifier, `None` when absent or zero.
    pub fn id(&self) -> Option<String> {
        self.file_id.as_ref().and_then(RawId::normalized)
    }

    pub fn type_hint(&self) -> &str {
        self.file_type.as_deref().unwrap_or("")
    }
}

/// Identifier that upstream may send as a number or a string.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    /// Canonical text form; zero and blank identifiers count as absent.
    pub fn normalized(&self) -> Option<String> {
        match self {
            RawId::Number(0) => None,
            RawId::Number(n) => Some(n.to_string()),
            RawId::Text(s) => {
                let s = s.trim();
                if s.is_empty() || s == "0" {
                    None
                } else {
                    Some(s.to_string())
                }
            }
        }
    }
}
