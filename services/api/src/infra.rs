use chrono::{DateTime, NaiveDate, Utc};
use realtor_ai::error::AppError;
use realtor_ai::workflows::cma::ValuationResult;
use realtor_ai::workflows::listing::ListingId;
use realtor_ai::workflows::matching::{
    ExplicitPreferences, Interaction, PreferenceModel, PreferenceVector,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::digest::ValuationCache;

/// Valuations keyed by subject listing, stamped with when they were produced.
#[derive(Default, Clone)]
pub(crate) struct InMemoryValuationCache {
    entries: Arc<Mutex<HashMap<ListingId, (DateTime<Utc>, ValuationResult)>>>,
}

impl ValuationCache for InMemoryValuationCache {
    fn fresh(&self, listing_id: &ListingId, not_before: DateTime<Utc>) -> Option<ValuationResult> {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(listing_id)
            .filter(|(generated_at, _)| *generated_at >= not_before)
            .map(|(_, result)| result.clone())
    }

    fn store(&self, result: ValuationResult, generated_at: DateTime<Utc>) {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(result.subject_id.clone(), (generated_at, result));
    }
}

impl InMemoryValuationCache {
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Stored client record: explicit hints plus the learned taste vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ClientProfile {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) prefs: Value,
    #[serde(default)]
    pub(crate) preference_vector: Value,
}

impl ClientProfile {
    pub(crate) fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }

    pub(crate) fn explicit_preferences(&self) -> ExplicitPreferences {
        ExplicitPreferences::from_raw(&self.prefs)
    }

    pub(crate) fn preference_vector(&self, now: DateTime<Utc>) -> PreferenceVector {
        PreferenceVector::from_persisted(&self.preference_vector, now)
    }

    /// Stored weights with staleness decay applied, as every ranking sees them.
    pub(crate) fn current_preferences(
        &self,
        model: &PreferenceModel,
        now: DateTime<Utc>,
    ) -> PreferenceVector {
        model.decay(self.preference_vector(now), now)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClientDocument {
    Many(Vec<ClientProfile>),
    One(ClientProfile),
}

/// Reads either a single client object or an array of them.
pub(crate) fn load_clients<P: AsRef<Path>>(path: P) -> Result<Vec<ClientProfile>, AppError> {
    let file = File::open(path)?;
    read_clients(BufReader::new(file))
}

pub(crate) fn read_clients<R: Read>(reader: R) -> Result<Vec<ClientProfile>, AppError> {
    let clients = match serde_json::from_reader(reader)? {
        ClientDocument::Many(clients) => clients,
        ClientDocument::One(client) => vec![client],
    };
    Ok(clients)
}

/// Interaction log as a `listing_id,signal` CSV.
pub(crate) fn load_interactions<P: AsRef<Path>>(path: P) -> Result<Vec<Interaction>, AppError> {
    let file = File::open(path)?;
    read_interactions(file)
}

pub(crate) fn read_interactions<R: Read>(reader: R) -> Result<Vec<Interaction>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader
        .deserialize()
        .map(|row| row.map_err(|err| AppError::Input(format!("interaction log: {err}"))))
        .collect()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Noon UTC on the given day, or the current instant when no day is given.
pub(crate) fn evaluation_instant(today: Option<NaiveDate>) -> DateTime<Utc> {
    today
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}
