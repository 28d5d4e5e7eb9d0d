use crate::config::pair_config::PairConfig;
use crate::error::StrategyError;
use crate::strategy::position_sizer::validate_sizing;
use crate::types::{instrument::Instrument, market_limits::MarketLimits};

/// Per-pair inputs shared by the components of one worker. The config never
/// changes; the limits only change through [`InstrumentContext::refresh_limits`].
#[derive(Debug, Clone)]
pub struct InstrumentContext {
    pub config: PairConfig,
    pub limits: MarketLimits,
}

impl InstrumentContext {
    pub fn new(config: PairConfig, limits: MarketLimits) -> Self {
        Self { config, limits }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.config.instrument
    }

    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    pub fn limits(&self) -> &MarketLimits {
        &self.limits
    }

    /// Replaces the limits with a fresh copy from the exchange. Fails, leaving
    /// the old limits in place, when the configured size no longer clears them.
    pub fn refresh_limits(&mut self, limits: MarketLimits) -> Result<bool, StrategyError> {
        validate_sizing(self.config.sizing, &limits)?;

        let changed = limits != self.limits;
        self.limits = limits;

        Ok(changed)
    }
}

pub trait WithContext {
    fn ctx(&self) -> &InstrumentContext;

    fn ctx_mut(&mut self) -> &mut InstrumentContext;
}
