use std::sync::Arc;

use anyhow::Result;

use crate::{
    error::StrategyError,
    gateway::{
        DynamicGateway,
        binance::{binance_config::BinanceConfig, binance_gateway::BinanceGateway},
        dry_run::{DryRunConfig, DryRunGateway},
    },
    scenario::{strategies::StrategyKind, venues::VenueKind},
    strategy::{
        instrument_context::InstrumentContext,
        strategies::{market_making::MarketMakingStrategy, scalping::ScalpingStrategy},
        strategy::Strategy,
    },
};

pub struct Scenario;

pub type DynamicStrategy = Box<dyn Strategy + Send>;

impl Scenario {
    pub fn gateway(kind: VenueKind) -> Result<DynamicGateway> {
        tracing::info!(venue = %kind, "creating exchange gateway");

        let gateway: DynamicGateway = match kind {
            VenueKind::DryRun => Arc::new(DryRunGateway::new(DryRunConfig::from_env()?)),
            VenueKind::Binance => Arc::new(BinanceGateway::new(BinanceConfig::from_env()?)?),
        };

        Ok(gateway)
    }

    pub fn strategy(
        kind: StrategyKind,
        ctx: InstrumentContext,
        gateway: DynamicGateway,
    ) -> Result<DynamicStrategy, StrategyError> {
        tracing::info!(strategy = %kind, pair = %ctx.instrument(), "creating strategy");

        let strategy: DynamicStrategy = match kind {
            StrategyKind::MarketMaking => Box::new(MarketMakingStrategy::new(ctx, gateway)?),
            StrategyKind::Scalping => Box::new(ScalpingStrategy::new(ctx, gateway)?),
        };

        Ok(strategy)
    }
}
