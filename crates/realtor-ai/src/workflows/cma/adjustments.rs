use super::domain::{AdjustmentKind, Adjustments, ComparableCandidate, ValuationError};
use crate::workflows::listing::Listing;

pub const BED_ADJUST_CENTS: i64 = 1_200_000;
pub const BATH_ADJUST_CENTS: i64 = 800_000;
pub const GARAGE_ADJUST_CENTS: i64 = 800_000;
pub const POOL_ADJUST_CENTS: i64 = 2_000_000;
pub const YEAR_ADJUST_CENTS: i64 = 100_000;
/// Share of the living-area rate applied to each square foot of lot.
pub const LOT_RATE_FACTOR: f64 = 0.15;

/// Brings a comparable's sale price in line with the subject's attributes.
#[derive(Debug, Clone, Copy)]
pub struct PriceAdjuster<'s> {
    subject: &'s Listing,
    baseline_psf: f64,
}

impl<'s> PriceAdjuster<'s> {
    pub fn new(subject: &'s Listing, baseline_psf: f64) -> Self {
        Self {
            subject,
            baseline_psf,
        }
    }

    /// Derives the baseline from the pool itself.
    pub fn for_pool(subject: &'s Listing, comparables: &[ComparableCandidate<'_>]) -> Self {
        Self::new(subject, baseline_price_per_sqft(subject, comparables))
    }

    pub fn adjust(&self, comp: &Listing) -> Result<(u64, Adjustments), ValuationError> {
        let base_price = comp
            .sale_price_cents()
            .ok_or_else(|| ValuationError::MissingPrice {
                listing_id: comp.id.clone(),
            })?;

        let subject = self.subject;
        let mut adjustments = Adjustments::new();

        if let (Some(ours), Some(theirs)) = (subject.beds, comp.beds) {
            record(
                &mut adjustments,
                AdjustmentKind::Bedrooms,
                (ours - theirs) * BED_ADJUST_CENTS as f64,
            );
        }

        if let (Some(ours), Some(theirs)) = (subject.baths, comp.baths) {
            record(
                &mut adjustments,
                AdjustmentKind::Bathrooms,
                (ours - theirs) * BATH_ADJUST_CENTS as f64,
            );
        }

        if let (Some(ours), Some(theirs)) = (positive(subject.sqft), positive(comp.sqft)) {
            record(
                &mut adjustments,
                AdjustmentKind::LivingArea,
                (ours - theirs) * self.baseline_psf,
            );
        }

        if let (Some(ours), Some(theirs)) = (positive(subject.lot_sqft), positive(comp.lot_sqft)) {
            record(
                &mut adjustments,
                AdjustmentKind::LotSize,
                (ours - theirs) * self.baseline_psf * LOT_RATE_FACTOR,
            );
        }

        if let Some(delta) = presence_delta(subject.has_parking(), comp.has_parking()) {
            adjustments.insert(AdjustmentKind::Garage, delta * GARAGE_ADJUST_CENTS);
        }

        if let Some(delta) = presence_delta(subject.has_pool(), comp.has_pool()) {
            adjustments.insert(AdjustmentKind::Pool, delta * POOL_ADJUST_CENTS);
        }

        if let (Some(ours), Some(theirs)) = (
            subject.year_built.filter(|year| *year > 0),
            comp.year_built.filter(|year| *year > 0),
        ) {
            record(
                &mut adjustments,
                AdjustmentKind::YearBuilt,
                f64::from(ours - theirs) * YEAR_ADJUST_CENTS as f64,
            );
        }

        let adjusted = adjustments
            .values()
            .fold(base_price as i64, |price, delta| price.saturating_add(*delta));

        Ok((adjusted.max(0) as u64, adjustments))
    }
}

/// Mean price per square foot (cents) across the pool, falling back to the
/// subject's own asking rate, else zero.
pub fn baseline_price_per_sqft(subject: &Listing, comparables: &[ComparableCandidate<'_>]) -> f64 {
    let rates: Vec<f64> = comparables
        .iter()
        .filter_map(|candidate| candidate.listing.price_per_sqft_cents())
        .collect();

    if !rates.is_empty() {
        return rates.iter().sum::<f64>() / rates.len() as f64;
    }

    match (
        subject.list_price_cents.filter(|price| *price > 0),
        subject.sqft.filter(|sqft| *sqft > 0),
    ) {
        (Some(price), Some(sqft)) => price as f64 / f64::from(sqft),
        _ => 0.0,
    }
}

fn positive(value: Option<u32>) -> Option<f64> {
    value.filter(|value| *value > 0).map(f64::from)
}

/// +1 when only the subject has the feature, -1 when only the comparable does.
fn presence_delta(subject_has: bool, comp_has: bool) -> Option<i64> {
    match (subject_has, comp_has) {
        (true, false) => Some(1),
        (false, true) => Some(-1),
        _ => None,
    }
}

/// Truncates toward zero and skips deltas that round away entirely.
fn record(adjustments: &mut Adjustments, kind: AdjustmentKind, delta: f64) {
    let cents = delta.trunc() as i64;
    if cents != 0 {
        adjustments.insert(kind, cents);
    }
}
