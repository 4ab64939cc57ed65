//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Events API harvesting (`EventHarvester`)
//! - Listing page harvesting (`ListingHarvester`)
//! - Link discovery (`LinkLadder`)
//! - Category and title classification

pub mod classify;
pub mod events;
pub mod listings;
pub mod selectors;
pub mod window;

pub use events::{ApiRunStats, EventHarvester};
pub use listings::{ListingHarvester, ListingRunStats};
pub use selectors::LinkLadder;
pub use window::DateWindow;
