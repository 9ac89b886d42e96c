//! Listing snapshots shared by the valuation and matching workflows.

pub mod domain;
mod import;

pub use domain::{Amenities, Listing, ListingId, ListingStatus};
pub use import::{ListingCsvImporter, ListingImportError};
