//! Taste matching: listing vectorization, similarity scoring with
//! explanations, and online preference learning with time decay.

mod features;
mod preferences;
mod scoring;

#[cfg(test)]
mod tests;

pub use features::{
    ExplicitPreferences, FeatureVector, FeatureVectorizer, NumericFeature, TagFeature,
};
pub use preferences::{Interaction, PreferenceModel, PreferenceVector};
pub use scoring::{
    cosine_similarity, explain, rank_listings, score, RankedListing, DEFAULT_EXPLAIN_TOP_K,
};
