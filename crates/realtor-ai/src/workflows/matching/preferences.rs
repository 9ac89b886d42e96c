use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::features::{
    ExplicitPreferences, FeatureVector, FeatureVectorizer, NumericFeature, TagFeature,
};
use crate::config::MatchingConfig;
use crate::workflows::listing::{Listing, ListingId};

/// Floor for the decay multiplier, however stale the weights are.
const MIN_DECAY_FACTOR: f64 = 0.2;
/// Weights fade to the floor over this many decay windows.
const DECAY_SPAN_WINDOWS: i64 = 4;

/// Learned per-feature weights for one client.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceVector {
    pub numeric: BTreeMap<NumericFeature, f64>,
    pub tags: BTreeMap<TagFeature, f64>,
    pub updated_at: DateTime<Utc>,
}

impl PreferenceVector {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            numeric: BTreeMap::new(),
            tags: BTreeMap::new(),
            updated_at: now,
        }
    }

    /// Rebuilds a vector from its stored JSON form. Unknown keys and
    /// non-numeric weights are dropped; an unreadable timestamp becomes `now`.
    pub fn from_persisted(raw: &Value, now: DateTime<Utc>) -> Self {
        let numeric = weights(raw.get("numeric"), NumericFeature::from_key);
        let tags = weights(raw.get("tags"), TagFeature::from_key);
        let updated_at = raw
            .get("updated_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or(now);

        Self {
            numeric,
            tags,
            updated_at,
        }
    }

    pub fn to_persisted(&self) -> Value {
        let numeric: Map<String, Value> = self
            .numeric
            .iter()
            .map(|(feature, weight)| (feature.key().to_string(), Value::from(*weight)))
            .collect();
        let tags: Map<String, Value> = self
            .tags
            .iter()
            .map(|(tag, weight)| (tag.key().to_string(), Value::from(*weight)))
            .collect();

        serde_json::json!({
            "numeric": numeric,
            "tags": tags,
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }

    pub fn weight(&self, feature: NumericFeature) -> f64 {
        self.numeric.get(&feature).copied().unwrap_or(0.0)
    }

    pub fn tag_weight(&self, tag: TagFeature) -> f64 {
        self.tags.get(&tag).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.tags.is_empty()
    }

    fn scale(&mut self, factor: f64) {
        self.numeric.values_mut().for_each(|weight| *weight *= factor);
        self.tags.values_mut().for_each(|weight| *weight *= factor);
    }
}

fn weights<K: Ord>(raw: Option<&Value>, parse: impl Fn(&str) -> Option<K>) -> BTreeMap<K, f64> {
    raw.and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(key, value)| {
                    let weight = value.as_f64().filter(|weight| weight.is_finite())?;
                    Some((parse(key)?, weight))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// One recorded reaction of a client to a listing. Positive signals mean
/// interest (saves, tours), negative ones mean dismissal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub listing_id: ListingId,
    #[serde(default)]
    pub signal: f64,
}

impl Interaction {
    pub fn new(listing_id: impl Into<String>, signal: f64) -> Self {
        Self {
            listing_id: ListingId(listing_id.into()),
            signal,
        }
    }
}

/// Online learner that nudges preference weights toward or away from the
/// listings a client reacts to.
#[derive(Debug, Clone)]
pub struct PreferenceModel {
    learning_rate: f64,
    decay_window: Duration,
}

impl PreferenceModel {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            decay_window: Duration::days(config.decay_window_days),
        }
    }

    /// Moves every weight by `learning_rate * signal * feature`. Tags that are
    /// absent from the listing leave their weights untouched.
    pub fn apply_feedback(
        &self,
        mut prefs: PreferenceVector,
        vector: &FeatureVector,
        signal: f64,
        learning_rate: Option<f64>,
        at: DateTime<Utc>,
    ) -> PreferenceVector {
        let step = learning_rate.unwrap_or(self.learning_rate) * signal;

        for (feature, value) in &vector.numeric {
            *prefs.numeric.entry(*feature).or_insert(0.0) += step * value;
        }
        for (tag, value) in &vector.tags {
            if *value > 0.0 {
                *prefs.tags.entry(*tag).or_insert(0.0) += step * value;
            }
        }

        prefs.updated_at = at;
        prefs
    }

    /// Shrinks stale weights toward zero. Vectors touched within the decay
    /// window come back unchanged.
    pub fn decay(&self, mut prefs: PreferenceVector, now: DateTime<Utc>) -> PreferenceVector {
        let elapsed = now - prefs.updated_at;
        if elapsed <= self.decay_window {
            return prefs;
        }

        let span_days = (self.decay_window.num_days() * DECAY_SPAN_WINDOWS).max(1) as f64;
        let factor = (1.0 - elapsed.num_days() as f64 / span_days).max(MIN_DECAY_FACTOR);
        prefs.scale(factor);
        prefs.updated_at = now;

        debug!(
            elapsed_days = elapsed.num_days(),
            factor, "decayed stale preference weights"
        );
        prefs
    }

    /// Decays the stored weights, then replays each interaction whose listing
    /// is known. Interactions for unknown listings are skipped.
    pub fn retrain(
        &self,
        prefs: PreferenceVector,
        interactions: &[Interaction],
        listings: &[Listing],
        vectorizer: &FeatureVectorizer,
        explicit: &ExplicitPreferences,
        now: DateTime<Utc>,
    ) -> PreferenceVector {
        let by_id: HashMap<&ListingId, &Listing> =
            listings.iter().map(|listing| (&listing.id, listing)).collect();

        let mut prefs = self.decay(prefs, now);
        let mut applied = 0usize;
        for interaction in interactions {
            let Some(listing) = by_id.get(&interaction.listing_id) else {
                debug!(listing = %interaction.listing_id, "interaction for unknown listing skipped");
                continue;
            };
            let vector = vectorizer.vectorize(listing, explicit);
            prefs = self.apply_feedback(prefs, &vector, interaction.signal, None, now);
            applied += 1;
        }

        info!(
            interactions = interactions.len(),
            applied, "preference vector retrained"
        );
        prefs
    }
}
