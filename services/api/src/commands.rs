use crate::digest::{ClientDigest, DigestPlanner};
use crate::infra::{
    evaluation_instant, load_clients, load_interactions, ClientProfile, InMemoryValuationCache,
};
use chrono::NaiveDate;
use clap::Args;
use realtor_ai::config::{AppConfig, ValuationConfig};
use realtor_ai::error::AppError;
use realtor_ai::workflows::cma::{format_cents, ValuationEngine, ValuationResult};
use realtor_ai::workflows::listing::{Listing, ListingCsvImporter};
use realtor_ai::workflows::matching::{
    rank_listings, FeatureVectorizer, PreferenceModel, RankedListing,
};
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ValueArgs {
    /// Listing CSV export containing the subject and its comparable pool
    #[arg(long)]
    pub(crate) listings: PathBuf,
    /// Id of the listing to value
    #[arg(long)]
    pub(crate) subject: String,
    /// Override the configured search radius in miles
    #[arg(long)]
    pub(crate) radius_miles: Option<f64>,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the raw valuation as JSON instead of a report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Listing CSV export to rank
    #[arg(long)]
    pub(crate) listings: PathBuf,
    /// Client profile JSON (a single object or an array)
    #[arg(long)]
    pub(crate) client: PathBuf,
    /// Pick a client by id when the profile file holds several
    #[arg(long)]
    pub(crate) client_id: Option<String>,
    /// Number of listings to return
    #[arg(long, default_value_t = 5)]
    pub(crate) limit: usize,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct RetrainArgs {
    /// Listing CSV export the interactions refer to
    #[arg(long)]
    pub(crate) listings: PathBuf,
    /// Client profile JSON (a single object or an array)
    #[arg(long)]
    pub(crate) client: PathBuf,
    /// Pick a client by id when the profile file holds several
    #[arg(long)]
    pub(crate) client_id: Option<String>,
    /// Interaction log CSV with `listing_id,signal` columns
    #[arg(long)]
    pub(crate) interactions: PathBuf,
    /// Write the updated client profile here
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct DigestArgs {
    /// Listing CSV export holding active listings and recent sales
    #[arg(long)]
    pub(crate) listings: PathBuf,
    /// Client profiles JSON array
    #[arg(long)]
    pub(crate) clients: PathBuf,
    /// Recommendations per client
    #[arg(long, default_value_t = 5)]
    pub(crate) limit: usize,
    /// Approved county; repeat to allow several. All counties when omitted.
    #[arg(long = "county")]
    pub(crate) counties: Vec<String>,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_value(args: ValueArgs, config: &AppConfig) -> Result<(), AppError> {
    let ValueArgs {
        listings,
        subject,
        radius_miles,
        today,
        json,
    } = args;

    let now = evaluation_instant(today);
    let listings = ListingCsvImporter::from_path(listings)?;
    let subject = find_listing(&listings, &subject)?;

    let mut valuation_config = config.valuation.clone();
    if let Some(radius) = radius_miles {
        valuation_config.radius_miles = radius;
    }
    valuation_config.validate()?;

    let engine = ValuationEngine::new(&valuation_config);
    let result = engine.value(subject, &listings, now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render_valuation(subject, &result, &valuation_config);
    }
    Ok(())
}

pub(crate) fn run_rank(args: RankArgs, config: &AppConfig) -> Result<(), AppError> {
    let RankArgs {
        listings,
        client,
        client_id,
        limit,
        today,
    } = args;

    let now = evaluation_instant(today);
    let listings = ListingCsvImporter::from_path(listings)?;
    let client = select_client(load_clients(client)?, client_id.as_deref())?;

    let prefs = client.current_preferences(&PreferenceModel::new(&config.matching), now);
    let explicit = client.explicit_preferences();
    let vectorizer = FeatureVectorizer::as_of(now);
    let candidates = listings.iter().filter(|listing| listing.status.is_on_market());
    let ranked = rank_listings(candidates, &prefs, &explicit, &vectorizer, limit);

    println!("Top listings for {}", client.display_name());
    render_ranking(&ranked);
    Ok(())
}

pub(crate) fn run_retrain(args: RetrainArgs, config: &AppConfig) -> Result<(), AppError> {
    let RetrainArgs {
        listings,
        client,
        client_id,
        interactions,
        output,
        today,
    } = args;

    let now = evaluation_instant(today);
    let listings = ListingCsvImporter::from_path(listings)?;
    let interactions = load_interactions(interactions)?;
    let mut client = select_client(load_clients(client)?, client_id.as_deref())?;

    let model = PreferenceModel::new(&config.matching);
    let retrained = model.retrain(
        client.preference_vector(now),
        &interactions,
        &listings,
        &FeatureVectorizer::as_of(now),
        &client.explicit_preferences(),
        now,
    );
    client.preference_vector = retrained.to_persisted();

    println!(
        "Replayed {} interactions for {}",
        interactions.len(),
        client.display_name()
    );
    println!("{}", serde_json::to_string_pretty(&client.preference_vector)?);

    if let Some(path) = output {
        fs::write(&path, serde_json::to_string_pretty(&client)?)?;
        println!("Updated profile written to {}", path.display());
    }
    Ok(())
}

pub(crate) fn run_digest(args: DigestArgs, config: &AppConfig) -> Result<(), AppError> {
    let DigestArgs {
        listings,
        clients,
        limit,
        counties,
        today,
    } = args;

    let now = evaluation_instant(today);
    let listings = ListingCsvImporter::from_path(listings)?;
    let clients = load_clients(clients)?;

    let engine = ValuationEngine::new(&config.valuation);
    let model = PreferenceModel::new(&config.matching);
    let cache = InMemoryValuationCache::default();
    let planner = DigestPlanner::new(
        &engine,
        &model,
        &cache,
        config.valuation.freshness_days,
        limit,
    )
    .with_counties(&counties);

    for digest in planner.build_all(&clients, &listings, now) {
        render_digest(&digest);
    }
    Ok(())
}

fn find_listing<'a>(listings: &'a [Listing], id: &str) -> Result<&'a Listing, AppError> {
    listings
        .iter()
        .find(|listing| listing.id.0 == id)
        .ok_or_else(|| AppError::Input(format!("listing {id} not found in export")))
}

fn select_client(
    clients: Vec<ClientProfile>,
    client_id: Option<&str>,
) -> Result<ClientProfile, AppError> {
    let found = match client_id {
        Some(id) => clients.into_iter().find(|client| client.id == id),
        None => clients.into_iter().next(),
    };
    found.ok_or_else(|| match client_id {
        Some(id) => AppError::Input(format!("client {id} not found")),
        None => AppError::Input("client profile file is empty".to_string()),
    })
}

pub(crate) fn render_valuation(
    subject: &Listing,
    result: &ValuationResult,
    config: &ValuationConfig,
) {
    println!(
        "Comparative market analysis for {} ({})",
        subject.id,
        subject.address_line.as_deref().unwrap_or("address withheld")
    );
    println!(
        "Radius {:.1} mi | {} comparables used | {} discarded",
        config.radius_miles,
        result.comps.len(),
        result.discarded
    );
    println!("{}", result.narrative());
    if let Some(list_price) = subject.list_price_cents {
        println!("List price {}", format_cents(list_price));
    }

    println!("\nComparables");
    for comp in &result.comps {
        println!(
            "- {} | sold {} -> adjusted {} | {:.2} mi | {} days back | similarity {:.2}",
            comp.listing_id,
            format_cents(comp.raw_price_cents),
            format_cents(comp.adjusted_price_cents),
            comp.distance_miles,
            comp.days_back,
            comp.similarity_score
        );
        for (kind, delta) in &comp.adjustments {
            let sign = if *delta < 0 { "-" } else { "+" };
            println!(
                "    {}: {}{}",
                kind.label(),
                sign,
                format_cents(delta.unsigned_abs())
            );
        }
    }

    if !result.psf_chart.is_empty() {
        println!("\nPrice per square foot");
        for point in &result.psf_chart {
            println!("- {}: ${:.2}", point.listing_id, point.price_per_sqft);
        }
    }

    match &result.deal_alert {
        Some(alert) => println!(
            "\nDeal alert: {} (list/market {:.2}; screened for {})",
            alert.rationale,
            alert.discount_ratio,
            alert.excluded_defects.join(", ")
        ),
        None => println!("\nDeal alert: none"),
    }
}

pub(crate) fn render_ranking(ranked: &[RankedListing<'_>]) {
    if ranked.is_empty() {
        println!("- no active listings to rank");
        return;
    }
    for (position, entry) in ranked.iter().enumerate() {
        let price = entry
            .listing
            .list_price_cents
            .map(format_cents)
            .unwrap_or_else(|| "price n/a".to_string());
        println!(
            "{}. {} ({}, {}) score {:.4}",
            position + 1,
            entry.listing.id,
            entry.listing.status.label(),
            price,
            entry.score
        );
        if !entry.explanation.is_empty() {
            println!("   why: {}", entry.explanation.join(", "));
        }
    }
}

pub(crate) fn render_digest(digest: &ClientDigest<'_>) {
    println!("\nDigest for {} ({})", digest.client_name, digest.client_id);
    if digest.entries.is_empty() {
        println!("- no recommendations today");
        return;
    }

    for entry in &digest.entries {
        let listing = entry.listing;
        println!(
            "- {} {} | {} | score {:.4}",
            listing.id,
            listing.address_line.as_deref().unwrap_or(""),
            listing
                .list_price_cents
                .map(format_cents)
                .unwrap_or_else(|| "price n/a".to_string()),
            entry.score
        );
        if !entry.explanation.is_empty() {
            println!("    highlights: {}", entry.explanation.join(", "));
        }
        match &entry.valuation {
            Ok(valuation) => println!(
                "    CMA {} to {} (confidence {:.0}%){}",
                format_cents(valuation.price_low_cents),
                format_cents(valuation.price_high_cents),
                valuation.confidence * 100.0,
                if valuation.deal_alert.is_some() {
                    " | deal alert"
                } else {
                    ""
                }
            ),
            Err(err) => println!("    CMA unavailable: {err}"),
        }
    }
}
