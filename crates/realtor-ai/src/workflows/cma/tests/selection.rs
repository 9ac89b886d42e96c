use chrono::Duration;

use super::common::*;
use crate::workflows::cma::{haversine_miles, ComparableSelector, CANDIDATE_POOL_CAP};
use crate::workflows::listing::ListingStatus;

#[test]
fn different_property_type_yields_no_candidates() {
    let subject = subject();
    let mut condo = closed_comp("CONDO", 44_000_000, 20);
    condo.property_type = Some("Condominium".to_string());
    condo.latitude = subject.latitude;
    condo.longitude = subject.longitude;

    let selected = ComparableSelector::new(180).select(&subject, [&condo], 1.0, now());
    assert!(selected.is_empty());
}

#[test]
fn applies_status_area_city_and_distance_filters() {
    let subject = subject();
    let keep = closed_comp("KEEP", 44_000_000, 30);

    let mut pending = closed_comp("PENDING", 45_000_000, 10);
    pending.status = ListingStatus::Pending;

    let mut active = closed_comp("ACTIVE", 45_000_000, 10);
    active.status = ListingStatus::Active;

    let mut too_large = closed_comp("LARGE", 60_000_000, 10);
    too_large.sqft = Some(2_200);

    let mut other_city = closed_comp("CITY", 45_000_000, 10);
    other_city.city = Some("Conshohocken".to_string());

    let mut no_coords = closed_comp("NOGEO", 45_000_000, 10);
    no_coords.longitude = None;

    let mut far = closed_comp("FAR", 45_000_000, 10);
    far.latitude = Some(40.2);

    let mut itself = subject.clone();
    itself.status = ListingStatus::Closed;

    let pool = vec![
        keep, pending, active, too_large, other_city, no_coords, far, itself,
    ];
    let selected = ComparableSelector::new(180).select(&subject, &pool, 1.0, now());
    let ids: Vec<&str> = selected
        .iter()
        .map(|candidate| candidate.listing.id.0.as_str())
        .collect();

    assert_eq!(ids, vec!["PENDING", "KEEP"]);
    let keep = selected
        .iter()
        .find(|candidate| candidate.listing.id.0 == "KEEP")
        .expect("closed comp kept");
    assert_eq!(keep.days_back, 30);
    assert!(keep.distance_miles > 0.3 && keep.distance_miles < 0.4);
}

#[test]
fn area_band_is_inclusive_at_twenty_percent() {
    let subject = subject();
    let mut lower = closed_comp("LOW", 40_000_000, 5);
    lower.sqft = Some(1_440);
    let mut upper = closed_comp("HIGH", 50_000_000, 6);
    upper.sqft = Some(2_160);
    let mut unknown = closed_comp("UNKNOWN", 45_000_000, 7);
    unknown.sqft = None;

    let pool = [lower, upper, unknown];
    let selected = ComparableSelector::new(180).select(&subject, &pool, 1.0, now());
    assert_eq!(selected.len(), 2);
}

#[test]
fn caps_pool_to_most_recent_updates_before_distance() {
    let subject = subject();
    let pool: Vec<_> = (0..60)
        .map(|index| closed_comp(&format!("C{index:02}"), 44_000_000, index + 1))
        .collect();

    let selected = ComparableSelector::new(180).select(&subject, &pool, 1.0, now());
    assert_eq!(selected.len(), CANDIDATE_POOL_CAP);
    assert_eq!(selected[0].listing.id.0, "C00");
    assert!(selected.iter().all(|candidate| candidate.days_back <= 50));
}

#[test]
fn days_back_falls_back_to_update_then_default() {
    let subject = subject();
    let mut updated_only = closed_comp("UPDATED", 44_000_000, 0);
    updated_only.off_market_at = None;
    updated_only.source_updated_at = Some(now() - Duration::days(12));

    let mut undated = closed_comp("UNDATED", 44_000_000, 0);
    undated.off_market_at = None;
    undated.source_updated_at = None;

    let pool = [updated_only, undated];
    let selected = ComparableSelector::new(180).select(&subject, &pool, 1.0, now());
    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0].listing.id.0, "UPDATED");
    assert_eq!(selected[0].days_back, 12);
    assert_eq!(selected[1].days_back, 180);
}

#[test]
fn haversine_matches_known_distances() {
    assert_eq!(haversine_miles(40.0, -75.0, 40.0, -75.0), 0.0);
    let one_degree = haversine_miles(40.0, -75.0, 41.0, -75.0);
    assert!((one_degree - 69.09).abs() < 0.01, "got {one_degree}");
    let symmetric = haversine_miles(41.0, -75.0, 40.0, -75.0);
    assert!((one_degree - symmetric).abs() < 1e-9);
}
