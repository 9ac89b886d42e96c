use tracing::{debug, info};

use super::adjustments::PriceAdjuster;
use super::domain::{
    ComparableCandidate, ComparableResult, DealAlert, PsfPoint, ValuationError, ValuationResult,
};
use crate::workflows::listing::Listing;

/// Condition notes that rule a listing out of deal alerts.
pub const DISQUALIFYING_CONDITIONS: [&str; 3] = ["mechanical", "electrical", "structural"];

/// Normal-consistent scale factor for the median absolute deviation.
const MAD_SCALE: f64 = 1.4826;
/// Band half-width floor, as a share of the median, when every comp agrees.
const FLAT_SPREAD_SHARE: f64 = 0.05;
const FULL_CONFIDENCE_COMPS: f64 = 6.0;
const RECENCY_HORIZON_DAYS: f64 = 180.0;

struct SimilarityWeights {
    beds: f64,
    baths: f64,
    living_area: f64,
    lot: f64,
    year: f64,
    distance: f64,
}

const SIMILARITY_WEIGHTS: SimilarityWeights = SimilarityWeights {
    beds: 0.20,
    baths: 0.20,
    living_area: 0.25,
    lot: 0.10,
    year: 0.10,
    distance: 0.15,
};

/// Folds adjusted comparable prices into a price band, confidence and deal flag.
#[derive(Debug, Clone)]
pub struct ValuationAggregator {
    deal_discount_threshold: f64,
    radius_miles: f64,
}

impl ValuationAggregator {
    pub fn new(deal_discount_threshold: f64, radius_miles: f64) -> Self {
        Self {
            deal_discount_threshold,
            radius_miles,
        }
    }

    pub fn aggregate<'a, I>(
        &self,
        subject: &Listing,
        comparables: I,
    ) -> Result<ValuationResult, ValuationError>
    where
        I: IntoIterator<Item = ComparableCandidate<'a>>,
    {
        let candidates: Vec<ComparableCandidate<'a>> = comparables.into_iter().collect();
        let adjuster = PriceAdjuster::for_pool(subject, &candidates);

        let days_on_market: Vec<u32> = candidates
            .iter()
            .map(|candidate| candidate.listing.days_on_market.unwrap_or(1).max(1))
            .collect();
        let mut comps = Vec::with_capacity(candidates.len());
        let mut discarded = 0;

        for candidate in &candidates {
            let comp = candidate.listing;
            let (adjusted_price_cents, adjustments) = match adjuster.adjust(comp) {
                Ok(adjusted) => adjusted,
                Err(err) => {
                    debug!(subject = %subject.id, %err, "skipping comparable");
                    discarded += 1;
                    continue;
                }
            };

            comps.push(ComparableResult {
                listing_id: comp.id.clone(),
                raw_price_cents: comp.sale_price_cents().unwrap_or_default(),
                adjusted_price_cents,
                adjustments,
                distance_miles: candidate.distance_miles,
                days_back: candidate.days_back,
                price_per_sqft: comp.price_per_sqft_cents().map(|psf| psf / 100.0),
                similarity_score: self.similarity(subject, candidate),
            });
        }

        if comps.is_empty() {
            return Err(ValuationError::InsufficientComparables {
                subject_id: subject.id.clone(),
                discarded,
            });
        }

        let prices: Vec<u64> = comps.iter().map(|comp| comp.adjusted_price_cents).collect();
        let price_mid = median(&prices) as u64;

        let deviations: Vec<f64> = prices
            .iter()
            .map(|price| (*price as f64 - price_mid as f64).abs())
            .collect();
        let mut mad = median_f64(deviations);
        if mad == 0.0 {
            mad = price_mid as f64 * FLAT_SPREAD_SHARE;
        }
        let half_width = (MAD_SCALE * mad) as u64;

        let psf_chart = comps
            .iter()
            .filter_map(|comp| {
                comp.price_per_sqft.map(|psf| PsfPoint {
                    listing_id: comp.listing_id.clone(),
                    price_per_sqft: round_to(psf, 2),
                })
            })
            .collect();

        let result = ValuationResult {
            subject_id: subject.id.clone(),
            price_low_cents: price_mid.saturating_sub(half_width),
            price_mid_cents: price_mid,
            price_high_cents: price_mid.saturating_add(half_width),
            confidence: confidence(&prices, &days_on_market),
            deal_alert: self.detect_deal(subject, price_mid),
            comps,
            psf_chart,
            discarded,
        };

        info!(
            subject = %subject.id,
            comps = result.comps.len(),
            discarded,
            price_mid_cents = result.price_mid_cents,
            confidence = result.confidence,
            deal = result.deal_alert.is_some(),
            "valuation complete"
        );

        Ok(result)
    }

    /// Display-only closeness of a comparable to the subject, in [0, 1].
    pub fn similarity(&self, subject: &Listing, candidate: &ComparableCandidate<'_>) -> f64 {
        let comp = candidate.listing;
        let weights = &SIMILARITY_WEIGHTS;

        let closeness = |ours: Option<f64>, theirs: Option<f64>| 1.0 - ratio_diff(ours, theirs);
        let distance_score = if self.radius_miles > 0.0 {
            (1.0 - candidate.distance_miles / self.radius_miles).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let composite = closeness(subject.beds, comp.beds) * weights.beds
            + closeness(subject.baths, comp.baths) * weights.baths
            + closeness(subject.sqft.map(f64::from), comp.sqft.map(f64::from))
                * weights.living_area
            + closeness(
                subject.lot_sqft.map(f64::from),
                comp.lot_sqft.map(f64::from),
            ) * weights.lot
            + closeness(
                subject.year_built.map(f64::from),
                comp.year_built.map(f64::from),
            ) * weights.year
            + distance_score * weights.distance;

        composite.clamp(0.0, 1.0)
    }

    pub fn detect_deal(&self, subject: &Listing, price_mid_cents: u64) -> Option<DealAlert> {
        let list_price_cents = subject.list_price_cents.filter(|price| *price > 0)?;
        if price_mid_cents == 0 {
            return None;
        }

        let ratio = list_price_cents as f64 / price_mid_cents as f64;
        if ratio > self.deal_discount_threshold {
            return None;
        }

        let issues: Vec<&str> = DISQUALIFYING_CONDITIONS
            .iter()
            .copied()
            .filter(|key| subject.has_condition_issue(key))
            .collect();
        if !issues.is_empty() {
            debug!(subject = %subject.id, ?issues, "deal alert suppressed by condition notes");
            return None;
        }

        Some(DealAlert {
            listing_id: subject.id.clone(),
            market_value_cents: price_mid_cents,
            list_price_cents,
            discount_ratio: round_to(ratio, 4),
            rationale: format!(
                "Priced {:.1}% below median CMA estimate.",
                (1.0 - ratio) * 100.0
            ),
            excluded_defects: DISQUALIFYING_CONDITIONS
                .iter()
                .map(|key| key.to_string())
                .collect(),
        })
    }
}

/// Size- and spread-driven confidence, discounted for thin market activity.
/// `days_on_market` covers every supplied comparable, priced or not.
fn confidence(prices: &[u64], days_on_market: &[u32]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }

    let median = median(prices);
    let deviations: Vec<f64> = prices
        .iter()
        .map(|price| (*price as f64 - median).abs())
        .collect();
    let mad = median_f64(deviations);
    let variability = if median > 0.0 { mad / median } else { 0.0 };
    let size_factor = (prices.len() as f64 / FULL_CONFIDENCE_COMPS).min(1.0);
    let base = (size_factor * (1.0 - variability)).clamp(0.2, 0.95);

    let recency_factor = if days_on_market.is_empty() {
        1.0
    } else {
        let mean_days = days_on_market.iter().map(|days| f64::from(*days)).sum::<f64>()
            / days_on_market.len() as f64;
        (mean_days / RECENCY_HORIZON_DAYS).clamp(0.8, 1.0)
    };

    round_to(base * recency_factor, 2)
}

/// Relative difference, or zero when either side is unknown or zero.
fn ratio_diff(ours: Option<f64>, theirs: Option<f64>) -> f64 {
    match (ours, theirs) {
        (Some(a), Some(b)) if a != 0.0 && b != 0.0 => (a - b).abs() / a.max(b).abs(),
        _ => 0.0,
    }
}

fn median(values: &[u64]) -> f64 {
    median_f64(values.iter().map(|value| *value as f64).collect())
}

fn median_f64(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_handles_odd_and_even_lengths() {
        assert_eq!(median(&[3, 1, 2]), 2.0);
        assert_eq!(median(&[4, 1, 3, 2]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn confidence_rewards_agreement_and_volume() {
        let tight = confidence(&[100, 100, 100, 100, 100, 100], &[180; 6]);
        assert_eq!(tight, 0.95);

        let sparse = confidence(&[100], &[180]);
        assert_eq!(sparse, 0.2);

        let stale_market = confidence(&[100, 100, 100, 100, 100, 100], &[1; 6]);
        assert_eq!(stale_market, 0.76);
    }

    #[test]
    fn ratio_diff_ignores_unknowns() {
        assert_eq!(ratio_diff(None, Some(3.0)), 0.0);
        assert_eq!(ratio_diff(Some(0.0), Some(3.0)), 0.0);
        assert_eq!(ratio_diff(Some(4.0), Some(3.0)), 0.25);
    }
}
