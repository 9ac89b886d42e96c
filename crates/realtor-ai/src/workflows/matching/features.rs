use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::listing::Listing;

const SQFT_SCALE: f64 = 4_000.0;
const LOT_SCALE: f64 = 20_000.0;
const YEAR_ORIGIN: f64 = 1950.0;
const YEAR_SCALE: f64 = 100.0;
/// HOA dues are scaled per hundred currency units (cents / 10 000).
const HOA_SCALE_CENTS: f64 = 10_000.0;
const DAYS_ON_MARKET_SCALE: f64 = 120.0;
const NEW_CONSTRUCTION_YEARS: i32 = 3;
const WALKABLE_SCORE: f64 = 70.0;
const LARGE_YARD_SQFT: u32 = 8_000;

/// Continuous listing attributes, each normalized onto a unit-ish scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFeature {
    Price,
    Sqft,
    Beds,
    Baths,
    LotSqft,
    YearBuilt,
    HoaFee,
    DaysOnMarket,
}

impl NumericFeature {
    pub const ALL: [Self; 8] = [
        Self::Price,
        Self::Sqft,
        Self::Beds,
        Self::Baths,
        Self::LotSqft,
        Self::YearBuilt,
        Self::HoaFee,
        Self::DaysOnMarket,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Sqft => "sqft",
            Self::Beds => "beds",
            Self::Baths => "baths",
            Self::LotSqft => "lot_sqft",
            Self::YearBuilt => "year_built",
            Self::HoaFee => "hoa_fee",
            Self::DaysOnMarket => "days_on_market",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|feature| feature.key() == key)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Price => "price fit",
            Self::Sqft => "living area",
            Self::Beds => "bedrooms",
            Self::Baths => "bathrooms",
            Self::LotSqft => "lot size",
            Self::YearBuilt => "year built",
            Self::HoaFee => "HOA fee",
            Self::DaysOnMarket => "days on market",
        }
    }
}

/// Boolean listing traits encoded as 0.0 / 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagFeature {
    HasGarage,
    HasPool,
    NewConstruction,
    Walkable,
    OpenFloorplan,
    FinishedBasement,
    LargeYard,
    Waterfront,
}

impl TagFeature {
    pub const ALL: [Self; 8] = [
        Self::HasGarage,
        Self::HasPool,
        Self::NewConstruction,
        Self::Walkable,
        Self::OpenFloorplan,
        Self::FinishedBasement,
        Self::LargeYard,
        Self::Waterfront,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::HasGarage => "has_garage",
            Self::HasPool => "has_pool",
            Self::NewConstruction => "new_construction",
            Self::Walkable => "walkable",
            Self::OpenFloorplan => "open_floorplan",
            Self::FinishedBasement => "finished_basement",
            Self::LargeYard => "large_yard",
            Self::Waterfront => "waterfront",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.key() == key)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::HasGarage => "garage",
            Self::HasPool => "pool",
            Self::NewConstruction => "new construction",
            Self::Walkable => "walkable",
            Self::OpenFloorplan => "open floor plan",
            Self::FinishedBasement => "finished basement",
            Self::LargeYard => "large yard",
            Self::Waterfront => "waterfront",
        }
    }
}

/// Normalized representation of a listing for taste scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub numeric: BTreeMap<NumericFeature, f64>,
    pub tags: BTreeMap<TagFeature, f64>,
}

impl FeatureVector {
    pub fn numeric(&self, feature: NumericFeature) -> f64 {
        self.numeric.get(&feature).copied().unwrap_or(0.0)
    }

    pub fn tag(&self, tag: TagFeature) -> f64 {
        self.tags.get(&tag).copied().unwrap_or(0.0)
    }
}

/// Explicit hints a client gave the agent. Only the price range shapes the
/// vector; everything else in the raw document is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplicitPreferences {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    /// Two-element `price` band, in whole currency units.
    pub price_band: Option<(f64, f64)>,
}

impl ExplicitPreferences {
    /// Reads `price_min`/`price_max` or a `price: [low, high]` band. Anything
    /// malformed is treated as absent.
    pub fn from_raw(raw: &Value) -> Self {
        let number = |key: &str| {
            raw.get(key)
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite() && *value > 0.0)
        };

        let price_band = raw
            .get("price")
            .and_then(Value::as_array)
            .filter(|band| band.len() == 2)
            .and_then(|band| Some((band[0].as_f64()?, band[1].as_f64()?)))
            .filter(|(low, high)| low.is_finite() && high.is_finite());

        Self {
            price_min: number("price_min"),
            price_max: number("price_max"),
            price_band,
        }
    }

    /// Target price in whole currency units, if the client expressed one.
    pub fn price_center(&self) -> Option<f64> {
        let center = match (self.price_band, self.price_min, self.price_max) {
            (Some((low, high)), _, _) => (low + high) / 2.0,
            (None, Some(min), Some(max)) => (min + max) / 2.0,
            (None, Some(bound), None) | (None, None, Some(bound)) => bound,
            (None, None, None) => return None,
        };
        Some(center).filter(|center| *center > 0.0)
    }
}

/// Maps listings to feature vectors relative to a fixed reference year, so the
/// same vectorizer always produces the same output for the same listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureVectorizer {
    reference_year: i32,
}

impl FeatureVectorizer {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn as_of(now: DateTime<Utc>) -> Self {
        Self::new(now.year())
    }

    pub fn vectorize(&self, listing: &Listing, explicit: &ExplicitPreferences) -> FeatureVector {
        let price = listing
            .asking_price_cents()
            .map(|cents| cents as f64 / 100.0)
            .unwrap_or(0.0);
        let center = explicit.price_center().unwrap_or(price);
        let price_fit = if center > 0.0 {
            (price - center) / center
        } else {
            0.0
        };

        let year_built = listing.year_built.unwrap_or(self.reference_year);

        let numeric = BTreeMap::from([
            (NumericFeature::Price, price_fit),
            (
                NumericFeature::Sqft,
                f64::from(listing.sqft.unwrap_or(0)) / SQFT_SCALE,
            ),
            (NumericFeature::Beds, listing.beds.unwrap_or(0.0)),
            (NumericFeature::Baths, listing.baths.unwrap_or(0.0)),
            (
                NumericFeature::LotSqft,
                f64::from(listing.lot_sqft.unwrap_or(0)) / LOT_SCALE,
            ),
            (
                NumericFeature::YearBuilt,
                (f64::from(year_built) - YEAR_ORIGIN) / YEAR_SCALE,
            ),
            (
                NumericFeature::HoaFee,
                listing.hoa_fee_cents.unwrap_or(0) as f64 / HOA_SCALE_CENTS,
            ),
            (
                NumericFeature::DaysOnMarket,
                f64::from(listing.days_on_market.unwrap_or(0)) / DAYS_ON_MARKET_SCALE,
            ),
        ]);

        let new_construction = listing
            .year_built
            .map(|year| year >= self.reference_year - NEW_CONSTRUCTION_YEARS)
            .unwrap_or(false);
        let walkable = listing
            .amenities
            .walk_score
            .map(|score| score >= WALKABLE_SCORE)
            .unwrap_or(false);
        let large_yard = listing
            .lot_sqft
            .map(|lot| lot >= LARGE_YARD_SQFT)
            .unwrap_or(false);

        let tags = BTreeMap::from([
            (TagFeature::HasGarage, indicator(listing.has_parking())),
            (TagFeature::HasPool, indicator(listing.has_pool())),
            (TagFeature::NewConstruction, indicator(new_construction)),
            (TagFeature::Walkable, indicator(walkable)),
            (
                TagFeature::OpenFloorplan,
                indicator(listing.has_feature(TagFeature::OpenFloorplan.key())),
            ),
            (
                TagFeature::FinishedBasement,
                indicator(listing.has_feature(TagFeature::FinishedBasement.key())),
            ),
            (TagFeature::LargeYard, indicator(large_yard)),
            (
                TagFeature::Waterfront,
                indicator(listing.has_feature(TagFeature::Waterfront.key())),
            ),
        ]);

        FeatureVector { numeric, tags }
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
