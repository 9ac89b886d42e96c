use chrono::{DateTime, Duration, Utc};
use realtor_ai::workflows::cma::{ValuationEngine, ValuationError, ValuationResult};
use realtor_ai::workflows::listing::{Listing, ListingId};
use realtor_ai::workflows::matching::{rank_listings, FeatureVectorizer, PreferenceModel};
use tracing::{info, warn};

use crate::infra::ClientProfile;

/// Storage for recent valuations so repeated digests reuse them.
pub(crate) trait ValuationCache {
    /// A valuation generated at or after `not_before`, if one exists.
    fn fresh(&self, listing_id: &ListingId, not_before: DateTime<Utc>) -> Option<ValuationResult>;
    fn store(&self, result: ValuationResult, generated_at: DateTime<Utc>);
}

#[derive(Debug)]
pub(crate) struct DigestEntry<'a> {
    pub(crate) listing: &'a Listing,
    pub(crate) score: f64,
    pub(crate) explanation: Vec<String>,
    pub(crate) valuation: Result<ValuationResult, ValuationError>,
}

#[derive(Debug)]
pub(crate) struct ClientDigest<'a> {
    pub(crate) client_id: String,
    pub(crate) client_name: String,
    pub(crate) entries: Vec<DigestEntry<'a>>,
}

impl ClientDigest<'_> {
    pub(crate) fn failed_valuations(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.valuation.is_err())
            .count()
    }
}

/// Builds per-client recommendation digests with a valuation band attached to
/// every recommended listing.
pub(crate) struct DigestPlanner<'a, C> {
    engine: &'a ValuationEngine,
    model: &'a PreferenceModel,
    cache: &'a C,
    freshness: Duration,
    limit: usize,
    approved_counties: Vec<String>,
}

impl<'a, C: ValuationCache> DigestPlanner<'a, C> {
    pub(crate) fn new(
        engine: &'a ValuationEngine,
        model: &'a PreferenceModel,
        cache: &'a C,
        freshness_days: i64,
        limit: usize,
    ) -> Self {
        Self {
            engine,
            model,
            cache,
            freshness: Duration::days(freshness_days),
            limit,
            approved_counties: Vec::new(),
        }
    }

    /// Restrict recommendations to these counties. An empty list allows all.
    pub(crate) fn with_counties(mut self, counties: &[String]) -> Self {
        self.approved_counties = counties
            .iter()
            .map(|county| county.trim().to_ascii_lowercase())
            .filter(|county| !county.is_empty())
            .collect();
        self
    }

    pub(crate) fn build_all<'l>(
        &self,
        clients: &[ClientProfile],
        listings: &'l [Listing],
        now: DateTime<Utc>,
    ) -> Vec<ClientDigest<'l>> {
        clients
            .iter()
            .map(|client| self.build(client, listings, now))
            .collect()
    }

    pub(crate) fn build<'l>(
        &self,
        client: &ClientProfile,
        listings: &'l [Listing],
        now: DateTime<Utc>,
    ) -> ClientDigest<'l> {
        let eligible = listings
            .iter()
            .filter(|listing| listing.status.is_on_market())
            .filter(|listing| self.county_allowed(listing));

        let prefs = client.current_preferences(self.model, now);
        let explicit = client.explicit_preferences();
        let vectorizer = FeatureVectorizer::as_of(now);
        let ranked = rank_listings(eligible, &prefs, &explicit, &vectorizer, self.limit);

        let entries: Vec<DigestEntry<'l>> = ranked
            .into_iter()
            .map(|entry| DigestEntry {
                valuation: self.ensure_valuation(entry.listing, listings, now),
                listing: entry.listing,
                score: entry.score,
                explanation: entry.explanation,
            })
            .collect();

        let digest = ClientDigest {
            client_id: client.id.clone(),
            client_name: client.display_name().to_string(),
            entries,
        };
        info!(
            client = %digest.client_id,
            recommendations = digest.entries.len(),
            failed_valuations = digest.failed_valuations(),
            "client digest assembled"
        );
        digest
    }

    fn county_allowed(&self, listing: &Listing) -> bool {
        if self.approved_counties.is_empty() {
            return true;
        }
        listing
            .county
            .as_deref()
            .map(|county| {
                let county = county.trim().to_ascii_lowercase();
                self.approved_counties.contains(&county)
            })
            .unwrap_or(false)
    }

    /// Reuses a valuation inside the freshness window, otherwise values the
    /// listing against the full pool. A failure only affects this entry.
    fn ensure_valuation(
        &self,
        listing: &Listing,
        pool: &[Listing],
        now: DateTime<Utc>,
    ) -> Result<ValuationResult, ValuationError> {
        if let Some(cached) = self.cache.fresh(&listing.id, now - self.freshness) {
            return Ok(cached);
        }

        match self.engine.value(listing, pool, now) {
            Ok(result) => {
                self.cache.store(result.clone(), now);
                Ok(result)
            }
            Err(err) => {
                warn!(listing = %listing.id, %err, "valuation unavailable for digest entry");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryValuationCache;
    use chrono::TimeZone;
    use realtor_ai::config::{MatchingConfig, ValuationConfig};
    use realtor_ai::workflows::listing::ListingStatus;
    use serde_json::Value;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn house(id: &str, status: ListingStatus, price_cents: u64) -> Listing {
        let mut listing = Listing::new(id, status);
        listing.property_type = Some("SingleFamily".to_string());
        listing.city = Some("Norristown".to_string());
        listing.county = Some("Montgomery".to_string());
        listing.latitude = Some(40.12);
        listing.longitude = Some(-75.34);
        listing.list_price_cents = Some(price_cents);
        listing.beds = Some(3.0);
        listing.baths = Some(2.0);
        listing.sqft = Some(1_800);
        listing
    }

    fn sold(id: &str, price_cents: u64) -> Listing {
        let mut listing = house(id, ListingStatus::Closed, price_cents);
        listing.close_price_cents = Some(price_cents);
        listing.latitude = Some(40.125);
        listing.off_market_at = Some(now() - Duration::days(30));
        listing.source_updated_at = Some(now() - Duration::days(30));
        listing
    }

    fn model() -> PreferenceModel {
        PreferenceModel::new(&MatchingConfig::default())
    }

    fn client() -> ClientProfile {
        ClientProfile {
            id: "client-1".to_string(),
            name: Some("Avery".to_string()),
            email: None,
            prefs: Value::Null,
            preference_vector: Value::Null,
        }
    }

    fn pool() -> Vec<Listing> {
        let mut condo = house("CONDO", ListingStatus::Active, 21_000_000);
        condo.property_type = Some("Condo".to_string());
        let mut elsewhere = house("ELSEWHERE", ListingStatus::Active, 30_000_000);
        elsewhere.county = Some("Delaware".to_string());

        vec![
            house("ACTIVE", ListingStatus::Active, 32_000_000),
            condo,
            elsewhere,
            house("WITHDRAWN", ListingStatus::Withdrawn, 31_000_000),
            sold("SOLD-1", 44_000_000),
            sold("SOLD-2", 45_000_000),
        ]
    }

    #[test]
    fn valuation_failures_stay_with_their_entry() {
        let engine = ValuationEngine::new(&ValuationConfig::default());
        let model = model();
        let cache = InMemoryValuationCache::default();
        let listings = pool();
        let planner = DigestPlanner::new(&engine, &model, &cache, 3, 5);

        let digest = planner.build(&client(), &listings, now());

        let mut ids: Vec<&str> = digest
            .entries
            .iter()
            .map(|entry| entry.listing.id.0.as_str())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["ACTIVE", "CONDO", "ELSEWHERE"]);
        assert_eq!(digest.client_name, "Avery");

        let condo = digest
            .entries
            .iter()
            .find(|entry| entry.listing.id.0 == "CONDO")
            .expect("condo recommended");
        assert!(matches!(
            condo.valuation,
            Err(ValuationError::InsufficientComparables { .. })
        ));

        let active = digest
            .entries
            .iter()
            .find(|entry| entry.listing.id.0 == "ACTIVE")
            .expect("active listing recommended");
        let valuation = active.valuation.as_ref().expect("active listing valued");
        assert_eq!(valuation.price_mid_cents, 44_500_000);
        assert!(digest.failed_valuations() >= 1);
    }

    #[test]
    fn county_filter_limits_recommendations() {
        let engine = ValuationEngine::new(&ValuationConfig::default());
        let model = model();
        let cache = InMemoryValuationCache::default();
        let listings = pool();
        let counties = vec![" montgomery ".to_string()];
        let planner =
            DigestPlanner::new(&engine, &model, &cache, 3, 1).with_counties(&counties);

        let digests = planner.build_all(&[client()], &listings, now());
        assert_eq!(digests.len(), 1);
        assert_eq!(digests[0].entries.len(), 1);
        assert_ne!(digests[0].entries[0].listing.id.0, "ELSEWHERE");
    }

    #[test]
    fn fresh_cached_valuations_are_reused() {
        let engine = ValuationEngine::new(&ValuationConfig::default());
        let model = model();
        let cache = InMemoryValuationCache::default();
        let listings: Vec<Listing> = pool()
            .into_iter()
            .filter(|listing| listing.id.0 != "CONDO" && listing.id.0 != "ELSEWHERE")
            .collect();

        let mut stale = engine
            .value(&listings[0], &listings, now())
            .expect("active listing values");
        stale.price_mid_cents = 1;
        cache.store(stale.clone(), now() - Duration::days(2));

        let planner = DigestPlanner::new(&engine, &model, &cache, 3, 5);
        let digest = planner.build(&client(), &listings, now());
        let reused = digest.entries[0].valuation.as_ref().expect("cached valuation");
        assert_eq!(reused.price_mid_cents, 1);

        cache.store(stale, now() - Duration::days(4));
        let digest = planner.build(&client(), &listings, now());
        let recomputed = digest.entries[0].valuation.as_ref().expect("recomputed valuation");
        assert_eq!(recomputed.price_mid_cents, 44_500_000);
    }

    #[test]
    fn digest_ranks_with_the_same_decayed_weights_as_rank() {
        let engine = ValuationEngine::new(&ValuationConfig::default());
        let model = model();
        let cache = InMemoryValuationCache::default();
        let mut listings = pool();
        listings[0].amenities.pool = true;
        listings[0].beds = Some(4.0);

        let mut client = client();
        client.preference_vector = serde_json::json!({
            "numeric": {"beds": 1.0, "price": -0.5},
            "tags": {"has_pool": 0.8},
            "updated_at": (now() - Duration::days(90)).to_rfc3339(),
        });

        let planner = DigestPlanner::new(&engine, &model, &cache, 3, 5);
        let digest = planner.build(&client, &listings, now());

        let prefs = client.current_preferences(&model, now());
        let expected = rank_listings(
            listings.iter().filter(|listing| listing.status.is_on_market()),
            &prefs,
            &client.explicit_preferences(),
            &FeatureVectorizer::as_of(now()),
            5,
        );

        assert_eq!(digest.entries.len(), expected.len());
        for (entry, ranked) in digest.entries.iter().zip(&expected) {
            assert_eq!(entry.listing.id, ranked.listing.id);
            assert_eq!(entry.score, ranked.score);
            assert_eq!(entry.explanation, ranked.explanation);
        }
        assert_eq!(digest.entries[0].listing.id.0, "ACTIVE");
    }
}
