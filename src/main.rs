mod config;
mod error;
mod execution;
mod gateway;
mod runner;
mod scenario;
mod signals;
mod strategy;
mod types;

use std::str::FromStr;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::settings::Settings;
use crate::runner::supervisor::{self, Supervisor};
use crate::scenario::scenario::Scenario;
use crate::scenario::strategies::StrategyKind;
use crate::scenario::venues::VenueKind;
use crate::types::instrument::Instrument;

#[derive(Debug, Clone, Parser)]
struct Args {
    #[arg(long, value_enum, default_value = "dry-run")]
    pub venue: VenueKind,

    #[arg(long, value_enum, default_value = "market-making")]
    pub strategy: StrategyKind,

    /// Comma separated pairs such as `ADA/USDT,BTC/USDT`; overrides TRADING_PAIRS.
    #[arg(long, value_delimiter = ',')]
    pub pairs: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("pairmaker=debug".parse()?)
                .add_directive("reqwest=info".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let pairs = args
        .pairs
        .iter()
        .map(|pair| Instrument::from_str(pair))
        .collect::<Result<Vec<_>>>()?;

    let settings = Settings::from_env()?.with_pairs(pairs);
    info!(
        venue = %args.venue,
        strategy = %args.strategy,
        pairs = ?settings.pairs,
        "starting"
    );

    let gateway = Scenario::gateway(args.venue)?;

    Supervisor::new(settings, args.strategy, gateway)
        .run(supervisor::ctrl_c())
        .await
}
