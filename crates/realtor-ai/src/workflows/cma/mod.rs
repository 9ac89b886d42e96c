//! Comparative market analysis: comparable selection, hedonic price
//! adjustment, robust price banding and deal detection.
//!
//! Every step is a pure computation over listing snapshots supplied by the
//! caller. Fetching the candidate pool and persisting results happen outside.

mod adjustments;
mod aggregate;
pub mod domain;
mod selector;

#[cfg(test)]
mod tests;

pub use adjustments::{
    baseline_price_per_sqft, PriceAdjuster, BATH_ADJUST_CENTS, BED_ADJUST_CENTS,
    GARAGE_ADJUST_CENTS, POOL_ADJUST_CENTS, YEAR_ADJUST_CENTS,
};
pub use aggregate::{ValuationAggregator, DISQUALIFYING_CONDITIONS};
pub use domain::{
    format_cents, AdjustmentKind, Adjustments, ComparableCandidate, ComparableResult, DealAlert,
    PsfPoint, ValuationError, ValuationResult,
};
pub use selector::{distance_miles, haversine_miles, ComparableSelector, CANDIDATE_POOL_CAP};

use chrono::{DateTime, Utc};

use crate::config::ValuationConfig;
use crate::workflows::listing::Listing;

/// Stateless engine wiring selection and aggregation under one configuration.
#[derive(Debug, Clone)]
pub struct ValuationEngine {
    selector: ComparableSelector,
    aggregator: ValuationAggregator,
    radius_miles: f64,
}

impl ValuationEngine {
    pub fn new(config: &ValuationConfig) -> Self {
        Self {
            selector: ComparableSelector::new(config.default_days_back),
            aggregator: ValuationAggregator::new(
                config.deal_discount_threshold,
                config.radius_miles,
            ),
            radius_miles: config.radius_miles,
        }
    }

    /// Select comparables for `subject` from a raw pool and value it.
    pub fn value<'a, I>(
        &self,
        subject: &Listing,
        candidate_pool: I,
        now: DateTime<Utc>,
    ) -> Result<ValuationResult, ValuationError>
    where
        I: IntoIterator<Item = &'a Listing>,
    {
        let comparables = self
            .selector
            .select(subject, candidate_pool, self.radius_miles, now);
        self.aggregator.aggregate(subject, comparables)
    }

    /// Value `subject` from comparables already chosen by the caller.
    pub fn aggregate<'a, I>(
        &self,
        subject: &Listing,
        comparables: I,
    ) -> Result<ValuationResult, ValuationError>
    where
        I: IntoIterator<Item = ComparableCandidate<'a>>,
    {
        self.aggregator.aggregate(subject, comparables)
    }
}
