//! Category and title classification.

use crate::models::{Category, SourceType};

/// Classify an API file by its free-text type hint.
///
/// Matching is case-insensitive. "Agenda Packet" must be checked before
/// plain "Agenda".
pub fn classify_file_type(type_hint: &str) -> Category {
    let hint = type_hint.to_lowercase();
    if hint.contains("agenda") && hint.contains("packet") {
        Category::AgendaPacket
    } else if hint.contains("agenda") {
        Category::Agenda
    } else if hint.contains("minutes") {
        Category::Minutes
    } else {
        Category::Other
    }
}

/// Category of a document found through a listing page.
///
/// Only the minutes page maps to a dedicated category; packet pages fall
/// back to `Other`.
pub fn listing_category(source_type: SourceType) -> Category {
    match source_type {
        SourceType::Minutes => Category::Minutes,
        SourceType::AgendaPacket => Category::Other,
    }
}

/// Meeting title derived from a listing link's text.
pub fn listing_title(link_text: &str) -> &'static str {
    if link_text.to_lowercase().contains("(workshop)") {
        "Board Workshop"
    } else {
        "Board Meeting"
    }
}

/// Download URL for an API file.
///
/// The portal serves every file kind under the `agenda` segment.
pub fn file_url(portal_url: &str, event_id: &str, file_id: &str) -> String {
    format!(
        "{}/event/{}/files/agenda/{}",
        portal_url.trim_end_matches('/'),
        event_id,
        file_id
    )
}
