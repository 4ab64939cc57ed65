// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod event;
mod listing;
mod record;

// Re-export all public types
pub use config::{ApiConfig, Config, CrawlerConfig, ListingsConfig, StorageConfig};
pub use event::{EventPage, EventRecord, FileRecord, RawId};
pub use listing::{CandidateLink, DocumentRequest, ListingSource, SourceType};
pub use record::{Category, MeetingDocumentRecord};
