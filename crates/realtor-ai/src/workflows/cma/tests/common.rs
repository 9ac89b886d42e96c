use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::ValuationConfig;
use crate::workflows::cma::ValuationEngine;
use crate::workflows::listing::{Listing, ListingStatus};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn engine() -> ValuationEngine {
    ValuationEngine::new(&ValuationConfig::default())
}

pub(super) fn subject() -> Listing {
    let mut listing = Listing::new("SUBJECT", ListingStatus::Active);
    listing.property_type = Some("SingleFamily".to_string());
    listing.address_line = Some("101 Sample Rd".to_string());
    listing.city = Some("Norristown".to_string());
    listing.county = Some("Montgomery".to_string());
    listing.latitude = Some(40.12);
    listing.longitude = Some(-75.34);
    listing.list_price_cents = Some(32_000_000);
    listing.beds = Some(3.0);
    listing.baths = Some(2.0);
    listing.sqft = Some(1_800);
    listing.lot_sqft = Some(6_000);
    listing.year_built = Some(1992);
    listing.days_on_market = Some(3);
    listing.source_updated_at = Some(now());
    listing
}

/// A closed sale sharing the subject's attributes, about a third of a mile
/// north, that left the market `days_ago` days before [`now`].
pub(super) fn closed_comp(id: &str, close_price_cents: u64, days_ago: i64) -> Listing {
    let mut listing = subject();
    listing.id = id.into();
    listing.status = ListingStatus::Closed;
    listing.list_price_cents = Some(close_price_cents + 1_000_000);
    listing.close_price_cents = Some(close_price_cents);
    listing.latitude = Some(40.125);
    listing.days_on_market = Some(45);
    listing.off_market_at = Some(now() - Duration::days(days_ago));
    listing.source_updated_at = Some(now() - Duration::days(days_ago));
    listing
}
