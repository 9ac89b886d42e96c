use chrono::{DateTime, TimeZone, Utc};

use crate::config::MatchingConfig;
use crate::workflows::listing::{Listing, ListingStatus};
use crate::workflows::matching::{FeatureVectorizer, PreferenceModel};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn model() -> PreferenceModel {
    PreferenceModel::new(&MatchingConfig::default())
}

pub(super) fn vectorizer() -> FeatureVectorizer {
    FeatureVectorizer::as_of(now())
}

/// Garage-equipped, walkable three-bed listing.
pub(super) fn walkable_listing(id: &str) -> Listing {
    let mut listing = Listing::new(id, ListingStatus::Active);
    listing.property_type = Some("SingleFamily".to_string());
    listing.city = Some("Norristown".to_string());
    listing.list_price_cents = Some(35_000_000);
    listing.beds = Some(3.0);
    listing.baths = Some(2.0);
    listing.sqft = Some(1_800);
    listing.lot_sqft = Some(5_000);
    listing.year_built = Some(1992);
    listing.amenities.garage = true;
    listing.amenities.walk_score = Some(70.0);
    listing
}

/// Large rural lot with a pool and no garage.
pub(super) fn acreage_listing(id: &str) -> Listing {
    let mut listing = Listing::new(id, ListingStatus::Active);
    listing.property_type = Some("SingleFamily".to_string());
    listing.list_price_cents = Some(52_000_000);
    listing.beds = Some(5.0);
    listing.baths = Some(3.5);
    listing.sqft = Some(3_600);
    listing.lot_sqft = Some(40_000);
    listing.year_built = Some(2024);
    listing.amenities.pool = true;
    listing.amenities.walk_score = Some(12.0);
    listing.days_on_market = Some(60);
    listing
}
