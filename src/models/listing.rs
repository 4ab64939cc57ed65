//! Listing page sources and the links discovered on them.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which listing page a link was discovered on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Minutes,
    AgendaPacket,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Minutes => "minutes",
            SourceType::AgendaPacket => "agenda_packet",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing page to harvest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingSource {
    /// URL of the listing page
    pub url: String,

    /// Kind of documents the page lists
    pub source_type: SourceType,
}

/// A link element found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    /// Visible link text with whitespace collapsed
    pub visible_text: String,

    /// Raw `href` attribute
    pub href: String,

    pub source_type: SourceType,
}

/// A dated, deduplicated link that still needs to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    /// Absolute URL to follow
    pub url: String,

    /// Meeting date parsed from the link text
    pub date: NaiveDate,

    /// Visible link text the date was parsed from
    pub link_text: String,

    pub source_type: SourceType,
}
