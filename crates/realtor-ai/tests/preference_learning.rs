use chrono::{DateTime, Duration, TimeZone, Utc};
use realtor_ai::config::MatchingConfig;
use realtor_ai::workflows::listing::{Listing, ListingCsvImporter};
use realtor_ai::workflows::matching::{
    rank_listings, ExplicitPreferences, FeatureVectorizer, Interaction, PreferenceModel,
    PreferenceVector,
};
use serde_json::json;

fn evaluation_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0)
        .single()
        .expect("valid evaluation time")
}

fn active_market() -> Vec<Listing> {
    let data = include_bytes!("fixtures/norristown_listings.csv");
    ListingCsvImporter::from_reader(&data[..])
        .expect("fixture imports")
        .into_iter()
        .filter(|listing| listing.status.is_on_market())
        .collect()
}

fn ranked_ids(
    listings: &[Listing],
    prefs: &PreferenceVector,
    explicit: &ExplicitPreferences,
    vectorizer: &FeatureVectorizer,
) -> Vec<String> {
    rank_listings(listings, prefs, explicit, vectorizer, 10)
        .into_iter()
        .map(|entry| entry.listing.id.0.clone())
        .collect()
}

#[test]
fn new_client_ranking_keeps_input_order() {
    let listings = active_market();
    let prefs = PreferenceVector::from_persisted(&json!(null), evaluation_time());
    let vectorizer = FeatureVectorizer::as_of(evaluation_time());

    let ranked = rank_listings(
        &listings,
        &prefs,
        &ExplicitPreferences::default(),
        &vectorizer,
        2,
    );
    assert_eq!(ranked.len(), 2);
    assert!(ranked.iter().all(|entry| entry.score == 0.0));
    assert_eq!(ranked[0].listing.id.0, "S-101");
    assert_eq!(ranked[1].listing.id.0, "S-202");
}

#[test]
fn feedback_loop_promotes_liked_listing_and_survives_persistence() {
    let listings = active_market();
    let model = PreferenceModel::new(&MatchingConfig::default());
    let vectorizer = FeatureVectorizer::as_of(evaluation_time());
    let explicit = ExplicitPreferences::from_raw(&json!({ "price": [250000, 350000] }));

    let interactions = vec![
        Interaction::new("S-303", 1.0),
        Interaction::new("S-101", -0.5),
        Interaction::new("DELISTED", 3.0),
    ];
    let prefs = model.retrain(
        PreferenceVector::empty(evaluation_time()),
        &interactions,
        &listings,
        &vectorizer,
        &explicit,
        evaluation_time(),
    );

    let ranked = ranked_ids(&listings, &prefs, &explicit, &vectorizer);
    assert_eq!(ranked.first().map(String::as_str), Some("S-303"));

    let stored = prefs.to_persisted();
    let restored = PreferenceVector::from_persisted(&stored, evaluation_time());
    assert_eq!(restored, prefs);
    assert_eq!(ranked_ids(&listings, &restored, &explicit, &vectorizer), ranked);
}

#[test]
fn decay_shrinks_weights_without_reordering_matches() {
    let listings = active_market();
    let model = PreferenceModel::new(&MatchingConfig::default());
    let vectorizer = FeatureVectorizer::as_of(evaluation_time());
    let explicit = ExplicitPreferences::default();

    let liked = vectorizer.vectorize(&listings[2], &explicit);
    let trained_at = evaluation_time() - Duration::days(120);
    let prefs = model.apply_feedback(
        PreferenceVector::empty(trained_at),
        &liked,
        1.0,
        None,
        trained_at,
    );
    let before = ranked_ids(&listings, &prefs, &explicit, &vectorizer);

    let decayed = model.decay(prefs.clone(), evaluation_time());
    assert_eq!(decayed.updated_at, evaluation_time());
    for (feature, weight) in &prefs.numeric {
        let shrunk = decayed.numeric[feature];
        assert!(shrunk.abs() <= weight.abs());
        assert!(shrunk.abs() >= weight.abs() * 0.2 - 1e-12);
    }
    assert_eq!(ranked_ids(&listings, &decayed, &explicit, &vectorizer), before);

    let again = model.decay(decayed.clone(), evaluation_time() + Duration::days(10));
    assert_eq!(again, decayed, "recently decayed weights are left alone");
}
