use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for listings supplied by the persistence layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Normalized market status. Provider spellings such as "Sold" or
/// "Active Under Contract" collapse onto these variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Active,
    ActiveUnderContract,
    ComingSoon,
    Pending,
    Closed,
    Withdrawn,
    Expired,
    OffMarket,
}

impl ListingStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        let status = match normalized.as_str() {
            "active" | "forsale" => Self::Active,
            "activeundercontract" | "contingent" | "undercontract" => Self::ActiveUnderContract,
            "comingsoon" => Self::ComingSoon,
            "pending" => Self::Pending,
            "closed" | "sold" => Self::Closed,
            "withdrawn" => Self::Withdrawn,
            "expired" => Self::Expired,
            "offmarket" | "canceled" | "cancelled" => Self::OffMarket,
            _ => return None,
        };
        Some(status)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::ActiveUnderContract => "Active Under Contract",
            Self::ComingSoon => "Coming Soon",
            Self::Pending => "Pending",
            Self::Closed => "Closed",
            Self::Withdrawn => "Withdrawn",
            Self::Expired => "Expired",
            Self::OffMarket => "Off Market",
        }
    }

    /// Statuses whose prices are usable as comparable sales.
    pub const fn is_comparable_source(self) -> bool {
        matches!(self, Self::Pending | Self::Closed)
    }

    pub const fn is_on_market(self) -> bool {
        matches!(
            self,
            Self::Active | Self::ActiveUnderContract | Self::ComingSoon
        )
    }
}

/// Amenity flags that feed both the taste vector and the price adjuster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Amenities {
    pub garage: bool,
    pub pool: bool,
    pub walk_score: Option<f64>,
}

/// Snapshot of a listing. Prices are integer cents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub status: ListingStatus,
    pub property_type: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub list_price_cents: Option<u64>,
    pub close_price_cents: Option<u64>,
    pub market_estimate_cents: Option<u64>,
    pub beds: Option<f64>,
    pub baths: Option<f64>,
    pub sqft: Option<u32>,
    pub lot_sqft: Option<u32>,
    pub year_built: Option<i32>,
    pub parking_spaces: Option<u32>,
    pub hoa_fee_cents: Option<u64>,
    pub days_on_market: Option<u32>,
    pub amenities: Amenities,
    /// Free-form feature tags such as `open_floorplan` or `waterfront`.
    pub features: BTreeSet<String>,
    /// Inspection or disclosure notes keyed by system (`structural`, `electrical`, ...).
    pub condition_notes: BTreeMap<String, String>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub off_market_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn new(id: impl Into<String>, status: ListingStatus) -> Self {
        Self {
            id: ListingId(id.into()),
            status,
            ..Self::default()
        }
    }

    /// Close price, falling back to list price. Zero is treated as unknown.
    pub fn sale_price_cents(&self) -> Option<u64> {
        self.close_price_cents
            .filter(|price| *price > 0)
            .or(self.list_price_cents.filter(|price| *price > 0))
    }

    /// Asking price used for taste scoring, falling back to the stored estimate.
    pub fn asking_price_cents(&self) -> Option<u64> {
        self.list_price_cents
            .filter(|price| *price > 0)
            .or(self.market_estimate_cents.filter(|price| *price > 0))
    }

    /// Sale price per square foot in cents; undefined without a positive area.
    pub fn price_per_sqft_cents(&self) -> Option<f64> {
        let sqft = self.sqft.filter(|sqft| *sqft > 0)?;
        let price = self.sale_price_cents()?;
        Some(price as f64 / f64::from(sqft))
    }

    pub fn has_parking(&self) -> bool {
        self.amenities.garage || self.parking_spaces.unwrap_or(0) > 0
    }

    pub fn has_pool(&self) -> bool {
        self.amenities.pool || self.has_feature("pool")
    }

    pub fn has_feature(&self, tag: &str) -> bool {
        self.features.contains(tag)
    }

    /// True when the note exists and carries a meaningful value.
    pub fn has_condition_issue(&self, key: &str) -> bool {
        self.condition_notes
            .get(key)
            .map(|note| is_truthy(note))
            .unwrap_or(false)
    }
}

fn is_truthy(note: &str) -> bool {
    let trimmed = note.trim();
    !trimmed.is_empty()
        && !matches!(
            trimmed.to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "none" | "n/a"
        )
}
