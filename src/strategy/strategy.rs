use std::time::Duration;

use async_trait::async_trait;

use crate::{
    error::StrategyError, runner::stop_signal::StopSignal,
    strategy::instrument_context::WithContext, strategy::scalp_monitor::ScalpExit,
};

/// What one cycle did, used for logging and to pick the next delay.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Quoted { placed: usize, cancelled: usize },
    DeRisked { cancelled: usize },
    ScalpClosed(ScalpExit),
    /// The stop signal arrived while a scalp position was being monitored.
    ScalpInterrupted,
}

#[async_trait]
pub trait Strategy: WithContext + Send {
    fn name(&self) -> &'static str;

    /// Runs exactly one cycle. Sleeps only where the strategy itself has to
    /// wait for the market (scalp ticks), never between cycles.
    async fn run_cycle(&mut self, stop: &StopSignal) -> Result<CycleOutcome, StrategyError>;

    fn next_delay(&self, outcome: &CycleOutcome) -> Duration;
}
