use crate::commands::{
    run_digest, run_rank, run_retrain, run_value, DigestArgs, RankArgs, RetrainArgs, ValueArgs,
};
use crate::demo::{run_demo, DemoArgs};
use clap::{Parser, Subcommand};
use realtor_ai::config::AppConfig;
use realtor_ai::error::AppError;
use realtor_ai::telemetry;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "realtor-ai",
    about = "Value listings against local comparables and match them to client taste",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produce a comparative market analysis for one listing
    Value(ValueArgs),
    /// Rank active listings for a client
    Rank(RankArgs),
    /// Replay a client's interaction log into their preference vector
    Retrain(RetrainArgs),
    /// Build recommendation digests with valuation bands for every client
    Digest(DigestArgs),
    /// Run an end-to-end demo on a synthetic market (default command)
    Demo(DemoArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    debug!(environment = config.environment.label(), "configuration loaded");

    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Value(args) => run_value(args, &config),
        Command::Rank(args) => run_rank(args, &config),
        Command::Retrain(args) => run_retrain(args, &config),
        Command::Digest(args) => run_digest(args, &config),
        Command::Demo(args) => run_demo(args, &config),
    }
}
