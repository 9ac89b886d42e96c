use crate::commands::{render_digest, render_ranking, render_valuation};
use crate::digest::DigestPlanner;
use crate::infra::{evaluation_instant, ClientProfile, InMemoryValuationCache};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use realtor_ai::config::AppConfig;
use realtor_ai::error::AppError;
use realtor_ai::workflows::cma::ValuationEngine;
use realtor_ai::workflows::listing::{Listing, ListingCsvImporter, ListingStatus};
use realtor_ai::workflows::matching::{
    rank_listings, FeatureVectorizer, Interaction, PreferenceModel,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Optional listing CSV export to use instead of the synthetic market.
    #[arg(long)]
    pub(crate) listings_csv: Option<PathBuf>,
    /// Recommendations to show (defaults to 3).
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

pub(crate) fn run_demo(args: DemoArgs, config: &AppConfig) -> Result<(), AppError> {
    let DemoArgs {
        today,
        listings_csv,
        limit,
    } = args;

    let now = evaluation_instant(today);
    let limit = limit.unwrap_or(3);
    let (listings, imported) = match listings_csv {
        Some(path) => (ListingCsvImporter::from_path(path)?, true),
        None => (synthetic_market(now), false),
    };

    println!("Realtor AI demo (evaluated {})", now.date_naive());
    if imported {
        println!("Data source: listing CSV import ({} listings)", listings.len());
    } else {
        println!("Data source: synthetic Norristown market ({} listings)", listings.len());
    }

    let engine = ValuationEngine::new(&config.valuation);
    println!();
    match listings.iter().find(|listing| listing.status.is_on_market()) {
        Some(subject) => match engine.value(subject, &listings, now) {
            Ok(result) => render_valuation(subject, &result, &config.valuation),
            Err(err) => println!("Valuation unavailable: {err}"),
        },
        None => println!("No active listing to value"),
    }

    let mut client = demo_client();
    let model = PreferenceModel::new(&config.matching);
    let vectorizer = FeatureVectorizer::as_of(now);
    let explicit = client.explicit_preferences();
    let interactions = vec![
        Interaction::new("NOR-214", 1.0),
        Interaction::new("NOR-330", -0.5),
    ];

    println!("\nLearning from {} interactions for {}", interactions.len(), client.display_name());
    let prefs = model.retrain(
        client.preference_vector(now),
        &interactions,
        &listings,
        &vectorizer,
        &explicit,
        now,
    );
    client.preference_vector = prefs.to_persisted();

    println!("\nTop listings for {}", client.display_name());
    let candidates = listings.iter().filter(|listing| listing.status.is_on_market());
    let ranked = rank_listings(candidates, &prefs, &explicit, &vectorizer, limit);
    render_ranking(&ranked);

    let cache = InMemoryValuationCache::default();
    let planner = DigestPlanner::new(
        &engine,
        &model,
        &cache,
        config.valuation.freshness_days,
        limit,
    );
    let clients = vec![client];
    for digest in planner.build_all(&clients, &listings, now) {
        render_digest(&digest);
    }

    // A second pass inside the freshness window is served from the cache.
    let repeat = planner.build_all(&clients, &listings, now + Duration::days(1));
    println!(
        "\nCached valuations: {} (reused for {} repeat digest entries)",
        cache.len(),
        repeat.iter().map(|digest| digest.entries.len()).sum::<usize>()
    );

    Ok(())
}

fn demo_client() -> ClientProfile {
    ClientProfile {
        id: "client-avery".to_string(),
        name: Some("Avery Client".to_string()),
        email: Some("avery@example.com".to_string()),
        prefs: json!({ "price": [300000, 420000] }),
        preference_vector: json!({}),
    }
}

struct SeedListing {
    id: &'static str,
    status: ListingStatus,
    property_type: &'static str,
    address: &'static str,
    price_dollars: u64,
    beds: f64,
    baths: f64,
    sqft: u32,
    lot_sqft: u32,
    year_built: i32,
    offset: (f64, f64),
    days_ago: i64,
}

fn synthetic_market(now: DateTime<Utc>) -> Vec<Listing> {
    let seeds = [
        SeedListing {
            id: "NOR-101",
            status: ListingStatus::Active,
            property_type: "SingleFamily",
            address: "101 Sample Rd",
            price_dollars: 320_000,
            beds: 3.0,
            baths: 2.0,
            sqft: 1_800,
            lot_sqft: 6_000,
            year_built: 1992,
            offset: (0.0, 0.0),
            days_ago: 3,
        },
        SeedListing {
            id: "NOR-214",
            status: ListingStatus::Active,
            property_type: "SingleFamily",
            address: "214 Chestnut St",
            price_dollars: 455_000,
            beds: 4.0,
            baths: 2.5,
            sqft: 2_200,
            lot_sqft: 9_500,
            year_built: 2004,
            offset: (0.004, -0.003),
            days_ago: 12,
        },
        SeedListing {
            id: "NOR-330",
            status: ListingStatus::Active,
            property_type: "Condo",
            address: "330 Main St #4",
            price_dollars: 210_000,
            beds: 2.0,
            baths: 1.0,
            sqft: 1_100,
            lot_sqft: 0,
            year_built: 1978,
            offset: (-0.002, 0.002),
            days_ago: 40,
        },
        SeedListing {
            id: "NOR-C1",
            status: ListingStatus::Closed,
            property_type: "SingleFamily",
            address: "12 Oak Ln",
            price_dollars: 440_000,
            beds: 3.0,
            baths: 2.0,
            sqft: 1_800,
            lot_sqft: 6_200,
            year_built: 1990,
            offset: (0.005, 0.0),
            days_ago: 45,
        },
        SeedListing {
            id: "NOR-C2",
            status: ListingStatus::Closed,
            property_type: "SingleFamily",
            address: "48 Elm Ave",
            price_dollars: 455_000,
            beds: 3.0,
            baths: 2.0,
            sqft: 1_900,
            lot_sqft: 6_000,
            year_built: 1995,
            offset: (-0.004, 0.004),
            days_ago: 30,
        },
        SeedListing {
            id: "NOR-C3",
            status: ListingStatus::Closed,
            property_type: "SingleFamily",
            address: "7 Birch Ct",
            price_dollars: 465_000,
            beds: 4.0,
            baths: 2.0,
            sqft: 1_800,
            lot_sqft: 7_000,
            year_built: 1992,
            offset: (0.006, -0.006),
            days_ago: 25,
        },
        SeedListing {
            id: "NOR-C4",
            status: ListingStatus::Pending,
            property_type: "SingleFamily",
            address: "90 Maple Dr",
            price_dollars: 470_000,
            beds: 4.0,
            baths: 2.5,
            sqft: 2_150,
            lot_sqft: 9_000,
            year_built: 2001,
            offset: (-0.007, -0.002),
            days_ago: 60,
        },
        SeedListing {
            id: "NOR-C5",
            status: ListingStatus::Closed,
            property_type: "SingleFamily",
            address: "3 Walnut Pl",
            price_dollars: 505_000,
            beds: 4.0,
            baths: 3.0,
            sqft: 2_300,
            lot_sqft: 10_000,
            year_built: 2008,
            offset: (0.002, 0.008),
            days_ago: 90,
        },
    ];

    seeds
        .into_iter()
        .map(|seed| {
            let mut listing = Listing::new(seed.id, seed.status);
            listing.property_type = Some(seed.property_type.to_string());
            listing.address_line = Some(seed.address.to_string());
            listing.city = Some("Norristown".to_string());
            listing.county = Some("Montgomery".to_string());
            listing.latitude = Some(40.12 + seed.offset.0);
            listing.longitude = Some(-75.34 + seed.offset.1);
            listing.beds = Some(seed.beds);
            listing.baths = Some(seed.baths);
            listing.sqft = Some(seed.sqft);
            listing.lot_sqft = Some(seed.lot_sqft).filter(|lot| *lot > 0);
            listing.year_built = Some(seed.year_built);
            listing.source_updated_at = Some(now - Duration::days(seed.days_ago));

            let price_cents = seed.price_dollars * 100;
            if seed.status.is_on_market() {
                listing.list_price_cents = Some(price_cents);
                listing.days_on_market = Some(seed.days_ago as u32);
            } else {
                listing.list_price_cents = Some(price_cents + 1_000_000);
                listing.close_price_cents = Some(price_cents);
                listing.days_on_market = Some(45);
                listing.off_market_at = Some(now - Duration::days(seed.days_ago));
            }

            match seed.id {
                "NOR-214" => {
                    listing.amenities.garage = true;
                    listing.amenities.pool = true;
                    listing.amenities.walk_score = Some(64.0);
                    listing.features.insert("finished_basement".to_string());
                }
                "NOR-330" => {
                    listing.amenities.walk_score = Some(88.0);
                    listing.hoa_fee_cents = Some(32_500);
                }
                "NOR-C5" => {
                    listing.amenities.garage = true;
                    listing.parking_spaces = Some(2);
                }
                "NOR-C4" => {
                    listing.amenities.pool = true;
                }
                _ => {}
            }
            listing
        })
        .collect()
}
