use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::workflows::listing::{Listing, ListingId};

/// Named hedonic adjustments applied to a comparable's sale price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Bedrooms,
    Bathrooms,
    LivingArea,
    LotSize,
    Garage,
    Pool,
    YearBuilt,
}

impl AdjustmentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bedrooms => "bedrooms",
            Self::Bathrooms => "bathrooms",
            Self::LivingArea => "living area",
            Self::LotSize => "lot size",
            Self::Garage => "garage",
            Self::Pool => "pool",
            Self::YearBuilt => "year built",
        }
    }
}

/// Signed deltas in cents, keyed by adjustment.
pub type Adjustments = BTreeMap<AdjustmentKind, i64>;

/// A comparable that survived selection, with its distance to the subject and
/// how many days ago it left the market.
#[derive(Debug, Clone, Copy)]
pub struct ComparableCandidate<'a> {
    pub listing: &'a Listing,
    pub distance_miles: f64,
    pub days_back: i64,
}

impl<'a> ComparableCandidate<'a> {
    pub fn new(listing: &'a Listing, distance_miles: f64, days_back: i64) -> Self {
        Self {
            listing,
            distance_miles,
            days_back,
        }
    }
}

/// Per-comparable line of a valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableResult {
    pub listing_id: ListingId,
    pub raw_price_cents: u64,
    pub adjusted_price_cents: u64,
    pub adjustments: Adjustments,
    pub distance_miles: f64,
    pub days_back: i64,
    /// Sale price per square foot in whole currency units.
    pub price_per_sqft: Option<f64>,
    pub similarity_score: f64,
}

/// One bar of the price-per-square-foot chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsfPoint {
    pub listing_id: ListingId,
    pub price_per_sqft: f64,
}

/// Raised when a listing is offered well below its estimated market value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealAlert {
    pub listing_id: ListingId,
    pub market_value_cents: u64,
    pub list_price_cents: u64,
    pub discount_ratio: f64,
    pub rationale: String,
    /// Condition categories screened and found clear before raising the alert.
    pub excluded_defects: Vec<String>,
}

/// Outcome of a comparative market analysis for one subject listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub subject_id: ListingId,
    pub price_low_cents: u64,
    pub price_mid_cents: u64,
    pub price_high_cents: u64,
    pub confidence: f64,
    pub comps: Vec<ComparableResult>,
    pub psf_chart: Vec<PsfPoint>,
    pub deal_alert: Option<DealAlert>,
    /// Comparables dropped for lack of price data.
    pub discarded: usize,
}

impl ValuationResult {
    pub fn narrative(&self) -> String {
        format!(
            "Median adjusted price {} (range {} to {}, confidence {:.0}%)",
            format_cents(self.price_mid_cents),
            format_cents(self.price_low_cents),
            format_cents(self.price_high_cents),
            self.confidence * 100.0
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("comparable {listing_id} has no close or list price")]
    MissingPrice { listing_id: ListingId },
    #[error("cannot value listing {subject_id} yet: no valid comparable sales ({discarded} discarded)")]
    InsufficientComparables {
        subject_id: ListingId,
        discarded: usize,
    },
}

/// Renders cents as whole currency units with thousands separators, e.g. `$450,000`.
pub fn format_cents(cents: u64) -> String {
    let dollars = cents.saturating_add(50) / 100;
    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}
