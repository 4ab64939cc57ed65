//! Pipeline entry points.
//!
//! - `run_harvest`: Run the events API and listing harvesters into one sink

pub mod harvest;

pub use harvest::{HarvestSelection, HarvestSummary, run_harvest};
