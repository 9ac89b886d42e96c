use std::collections::BTreeMap;

use serde::Serialize;

use super::features::{ExplicitPreferences, FeatureVector, FeatureVectorizer};
use super::preferences::PreferenceVector;
use crate::workflows::listing::Listing;

const NUMERIC_SHARE: f64 = 0.7;
const TAG_SHARE: f64 = 0.3;
pub const DEFAULT_EXPLAIN_TOP_K: usize = 3;

/// Cosine similarity over the union of keys, treating missing entries as zero.
/// Empty or all-zero maps score 0.
pub fn cosine_similarity<K: Ord>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .filter_map(|(key, lhs)| b.get(key).map(|rhs| lhs * rhs))
        .sum();
    let norm_a = a.values().map(|value| value * value).sum::<f64>().sqrt();
    let norm_b = b.values().map(|value| value * value).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Blended similarity between a listing and a client's learned taste,
/// rounded to four places.
pub fn score(vector: &FeatureVector, prefs: &PreferenceVector) -> f64 {
    let numeric = cosine_similarity(&vector.numeric, &prefs.numeric);
    let tags = cosine_similarity(&vector.tags, &prefs.tags);
    let blended = NUMERIC_SHARE * numeric + TAG_SHARE * tags;
    (blended * 10_000.0).round() / 10_000.0
}

/// Labels for the `top_k` features contributing most (by magnitude) to the
/// match, e.g. `"bedrooms (+0.25)"`. Ties keep feature order.
pub fn explain(vector: &FeatureVector, prefs: &PreferenceVector, top_k: usize) -> Vec<String> {
    let mut contributions: Vec<(&'static str, f64)> = vector
        .numeric
        .iter()
        .map(|(feature, value)| (feature.label(), value * prefs.weight(*feature)))
        .collect();
    contributions.extend(
        vector
            .tags
            .iter()
            .filter(|(_, value)| **value > 0.0)
            .map(|(tag, _)| (tag.label(), prefs.tag_weight(*tag))),
    );

    contributions.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    contributions
        .into_iter()
        .take(top_k)
        .map(|(label, contribution)| {
            let sign = if contribution >= 0.0 { '+' } else { '-' };
            format!("{label} ({sign}{:.2})", contribution.abs())
        })
        .collect()
}

/// A listing with its match score and explanation.
#[derive(Debug, Clone, Serialize)]
pub struct RankedListing<'a> {
    pub listing: &'a Listing,
    pub score: f64,
    pub explanation: Vec<String>,
}

/// Scores every listing against the client's taste and returns the best
/// `limit`, highest first. Equal scores keep input order.
pub fn rank_listings<'a, I>(
    listings: I,
    prefs: &PreferenceVector,
    explicit: &ExplicitPreferences,
    vectorizer: &FeatureVectorizer,
    limit: usize,
) -> Vec<RankedListing<'a>>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let mut ranked: Vec<RankedListing<'a>> = listings
        .into_iter()
        .map(|listing| {
            let vector = vectorizer.vectorize(listing, explicit);
            RankedListing {
                listing,
                score: score(&vector, prefs),
                explanation: explain(&vector, prefs, DEFAULT_EXPLAIN_TOP_K),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}
