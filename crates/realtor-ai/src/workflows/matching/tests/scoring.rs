use std::collections::BTreeMap;

use super::common::*;
use crate::workflows::matching::{
    cosine_similarity, explain, rank_listings, score, ExplicitPreferences, NumericFeature,
    PreferenceVector,
};

#[test]
fn empty_preferences_score_zero_for_every_listing() {
    let prefs = PreferenceVector::empty(now());
    let explicit = ExplicitPreferences::default();

    for listing in [walkable_listing("W"), acreage_listing("A")] {
        let vector = vectorizer().vectorize(&listing, &explicit);
        assert_eq!(score(&vector, &prefs), 0.0);
    }

    let vector = vectorizer().vectorize(&walkable_listing("W"), &explicit);
    assert_eq!(vector.numeric(NumericFeature::Sqft), 0.45);
}

#[test]
fn positive_then_negative_feedback_moves_score() {
    let listing = walkable_listing("W");
    let explicit = ExplicitPreferences::default();
    let vector = vectorizer().vectorize(&listing, &explicit);
    let model = model();

    let liked = model.apply_feedback(PreferenceVector::empty(now()), &vector, 1.0, None, now());
    let liked_score = score(&vector, &liked);
    assert!((liked_score - 1.0).abs() < 1e-9, "score was {liked_score}");

    let reverted = model.apply_feedback(liked, &vector, -1.0, None, now());
    let reverted_score = score(&vector, &reverted);
    assert!(reverted_score < liked_score);
    assert_eq!(reverted_score, 0.0);
}

#[test]
fn disliked_profile_scores_opposite_listing_low() {
    let explicit = ExplicitPreferences::default();
    let walkable = vectorizer().vectorize(&walkable_listing("W"), &explicit);
    let acreage = vectorizer().vectorize(&acreage_listing("A"), &explicit);

    let prefs = model().apply_feedback(PreferenceVector::empty(now()), &walkable, -1.0, None, now());
    assert!(score(&walkable, &prefs) < 0.0);
    assert!(score(&acreage, &prefs) <= score(&walkable, &PreferenceVector::empty(now())));
}

#[test]
fn cosine_is_symmetric_bounded_and_zero_for_degenerate_input() {
    let a = BTreeMap::from([("x", 1.0), ("y", 2.0)]);
    let b = BTreeMap::from([("y", -3.0), ("z", 0.5)]);
    let zeros = BTreeMap::from([("x", 0.0), ("y", 0.0)]);
    let empty: BTreeMap<&str, f64> = BTreeMap::new();

    let ab = cosine_similarity(&a, &b);
    assert_eq!(ab, cosine_similarity(&b, &a));
    assert!((-1.0..=1.0).contains(&ab));
    assert!(ab < 0.0);

    assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-12);
    assert_eq!(cosine_similarity(&a, &zeros), 0.0);
    assert_eq!(cosine_similarity(&a, &empty), 0.0);
    assert_eq!(cosine_similarity(&empty, &empty), 0.0);
}

#[test]
fn explanation_lists_strongest_contributions_first() {
    let listing = walkable_listing("W");
    let explicit = ExplicitPreferences::default();
    let vector = vectorizer().vectorize(&listing, &explicit);

    let liked = model().apply_feedback(PreferenceVector::empty(now()), &vector, 1.0, None, now());
    assert_eq!(
        explain(&vector, &liked, 3),
        vec!["bedrooms (+2.25)", "bathrooms (+1.00)", "garage (+0.25)"]
    );

    let disliked =
        model().apply_feedback(PreferenceVector::empty(now()), &vector, -1.0, None, now());
    let labels = explain(&vector, &disliked, 1);
    assert_eq!(labels, vec!["bedrooms (-2.25)"]);

    assert!(explain(&vector, &liked, 0).is_empty());
}

#[test]
fn ranking_sorts_by_score_and_keeps_ties_in_input_order() {
    let explicit = ExplicitPreferences::default();
    let liked = walkable_listing("LIKED");
    let prefs = model().apply_feedback(
        PreferenceVector::empty(now()),
        &vectorizer().vectorize(&liked, &explicit),
        1.0,
        None,
        now(),
    );

    let listings = vec![
        acreage_listing("ACREAGE"),
        walkable_listing("FIRST"),
        walkable_listing("SECOND"),
    ];
    let ranked = rank_listings(&listings, &prefs, &explicit, &vectorizer(), 2);

    let ids: Vec<&str> = ranked.iter().map(|entry| entry.listing.id.0.as_str()).collect();
    assert_eq!(ids, vec!["FIRST", "SECOND"]);
    assert_eq!(ranked[0].score, ranked[1].score);
    assert_eq!(ranked[0].explanation.len(), 3);

    let everything = rank_listings(&listings, &prefs, &explicit, &vectorizer(), 10);
    assert_eq!(everything.len(), 3);
    assert_eq!(everything[2].listing.id.0, "ACREAGE");
    assert!(everything[2].score < everything[0].score);
}
