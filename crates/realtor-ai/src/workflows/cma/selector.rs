use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::ComparableCandidate;
use crate::workflows::listing::Listing;

const EARTH_RADIUS_MILES: f64 = 3958.8;
/// Candidates kept after attribute filtering, before distances are computed.
pub const CANDIDATE_POOL_CAP: usize = 50;
const LIVING_AREA_TOLERANCE: f64 = 0.2;

/// Narrows a raw pool of listings down to comparables for one subject.
#[derive(Debug, Clone)]
pub struct ComparableSelector {
    default_days_back: i64,
}

impl ComparableSelector {
    pub fn new(default_days_back: i64) -> Self {
        Self { default_days_back }
    }

    /// Returns comparables in most-recently-updated order.
    pub fn select<'a, I>(
        &self,
        subject: &Listing,
        candidate_pool: I,
        radius_miles: f64,
        now: DateTime<Utc>,
    ) -> Vec<ComparableCandidate<'a>>
    where
        I: IntoIterator<Item = &'a Listing>,
    {
        let area_band = subject
            .sqft
            .filter(|sqft| *sqft > 0)
            .map(|sqft| {
                let sqft = f64::from(sqft);
                (
                    (sqft * (1.0 - LIVING_AREA_TOLERANCE)) as u32,
                    (sqft * (1.0 + LIVING_AREA_TOLERANCE)) as u32,
                )
            });

        let mut eligible: Vec<&'a Listing> = candidate_pool
            .into_iter()
            .filter(|candidate| candidate.id != subject.id)
            .filter(|candidate| candidate.status.is_comparable_source())
            .filter(|candidate| candidate.property_type == subject.property_type)
            .filter(|candidate| match area_band {
                Some((min, max)) => candidate
                    .sqft
                    .map(|sqft| (min..=max).contains(&sqft))
                    .unwrap_or(false),
                None => true,
            })
            .filter(|candidate| match subject.city.as_deref() {
                Some(city) => candidate
                    .city
                    .as_deref()
                    .map(|other| other.trim().eq_ignore_ascii_case(city.trim()))
                    .unwrap_or(false),
                None => true,
            })
            .collect();

        // Undated listings sort last.
        eligible.sort_by(|a, b| b.source_updated_at.cmp(&a.source_updated_at));
        eligible.truncate(CANDIDATE_POOL_CAP);

        let selected: Vec<ComparableCandidate<'a>> = eligible
            .into_iter()
            .filter_map(|candidate| {
                let distance = distance_miles(subject, candidate)?;
                if distance > radius_miles {
                    return None;
                }
                Some(ComparableCandidate::new(
                    candidate,
                    distance,
                    self.days_back(candidate, now),
                ))
            })
            .collect();

        debug!(
            subject = %subject.id,
            selected = selected.len(),
            radius_miles,
            "selected comparables"
        );
        selected
    }

    fn days_back(&self, candidate: &Listing, now: DateTime<Utc>) -> i64 {
        candidate
            .off_market_at
            .or(candidate.source_updated_at)
            .map(|date| (now - date).num_days().max(0))
            .unwrap_or(self.default_days_back)
    }
}

/// Great-circle distance between two listings, if both are geocoded.
pub fn distance_miles(a: &Listing, b: &Listing) -> Option<f64> {
    Some(haversine_miles(
        a.latitude?,
        a.longitude?,
        b.latitude?,
        b.longitude?,
    ))
}

pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin() * EARTH_RADIUS_MILES
}
