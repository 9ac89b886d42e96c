use super::domain::{Amenities, Listing, ListingId, ListingStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ListingImportError {
    #[error("failed to read listing export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid listing CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("listing row {row} ({id}): {reason}")]
    InvalidRow {
        row: usize,
        id: String,
        reason: String,
    },
}

/// Loads listing snapshots from a flat CSV export. Prices are whole currency
/// units in the file and cents once loaded.
pub struct ListingCsvImporter;

impl ListingCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Listing>, ListingImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Listing>, ListingImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut listings = Vec::new();

        for (index, record) in csv_reader.deserialize::<ListingRow>().enumerate() {
            let row = record?;
            listings.push(row.into_listing(index + 1)?);
        }

        Ok(listings)
    }
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    id: String,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    property_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    county: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    list_price: Option<f64>,
    #[serde(default)]
    close_price: Option<f64>,
    #[serde(default)]
    market_estimate: Option<f64>,
    #[serde(default)]
    beds: Option<f64>,
    #[serde(default)]
    baths: Option<f64>,
    #[serde(default)]
    sqft: Option<u32>,
    #[serde(default)]
    lot_sqft: Option<u32>,
    #[serde(default)]
    year_built: Option<i32>,
    #[serde(default)]
    parking_spaces: Option<u32>,
    #[serde(default)]
    hoa_fee: Option<f64>,
    #[serde(default)]
    days_on_market: Option<u32>,
    #[serde(default, deserialize_with = "flag")]
    garage: bool,
    #[serde(default, deserialize_with = "flag")]
    pool: bool,
    #[serde(default)]
    walk_score: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    features: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    condition_issues: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    source_updated_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    off_market_at: Option<String>,
}

impl ListingRow {
    fn into_listing(self, row: usize) -> Result<Listing, ListingImportError> {
        let invalid = |reason: String| ListingImportError::InvalidRow {
            row,
            id: self.id.clone(),
            reason,
        };

        let status = ListingStatus::parse(&self.status)
            .ok_or_else(|| invalid(format!("unknown status '{}'", self.status)))?;
        let list_price_cents = to_cents(self.list_price).map_err(&invalid)?;
        let close_price_cents = to_cents(self.close_price).map_err(&invalid)?;
        let market_estimate_cents = to_cents(self.market_estimate).map_err(&invalid)?;
        let hoa_fee_cents = to_cents(self.hoa_fee).map_err(&invalid)?;
        let source_updated_at = parse_timestamp(self.source_updated_at.as_deref())
            .map_err(|value| invalid(format!("unparseable source_updated_at '{value}'")))?;
        let off_market_at = parse_timestamp(self.off_market_at.as_deref())
            .map_err(|value| invalid(format!("unparseable off_market_at '{value}'")))?;

        Ok(Listing {
            id: ListingId(self.id.clone()),
            status,
            property_type: self.property_type,
            address_line: self.address,
            city: self.city,
            county: self.county,
            latitude: self.latitude,
            longitude: self.longitude,
            list_price_cents,
            close_price_cents,
            market_estimate_cents,
            beds: self.beds,
            baths: self.baths,
            sqft: self.sqft,
            lot_sqft: self.lot_sqft,
            year_built: self.year_built,
            parking_spaces: self.parking_spaces,
            hoa_fee_cents,
            days_on_market: self.days_on_market,
            amenities: Amenities {
                garage: self.garage,
                pool: self.pool,
                walk_score: self.walk_score,
            },
            features: split_list(self.features.as_deref())
                .map(|tag| tag.to_ascii_lowercase())
                .collect::<BTreeSet<_>>(),
            condition_notes: parse_condition_notes(self.condition_issues.as_deref()),
            source_updated_at,
            off_market_at,
        })
    }
}

/// Rounds half away from zero to whole cents.
fn to_cents(value: Option<f64>) -> Result<Option<u64>, String> {
    match value {
        None => Ok(None),
        Some(amount) if amount.is_finite() && amount >= 0.0 => {
            Ok(Some((amount * 100.0).round() as u64))
        }
        Some(amount) => Err(format!("monetary amount {amount} must be non-negative")),
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}

/// Entries are `key` or `key: note`, separated by `;`.
fn parse_condition_notes(raw: Option<&str>) -> BTreeMap<String, String> {
    split_list(raw)
        .map(|entry| match entry.split_once(':') {
            Some((key, note)) if !note.trim().is_empty() => {
                (key.trim().to_ascii_lowercase(), note.trim().to_string())
            }
            Some((key, _)) => (key.trim().to_ascii_lowercase(), "reported".to_string()),
            None => (entry.to_ascii_lowercase(), "reported".to_string()),
        })
        .collect()
}

fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    let Some(trimmed) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(midnight.and_utc()));
    }

    Err(trimmed.to_string())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(
        opt.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "y")
    ))
}
