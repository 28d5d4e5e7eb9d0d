use std::time::Duration;

use tracing::{error, info, warn};

use crate::{
    config::pair_config::PairConfig,
    error::{Recovery, StrategyError},
    gateway::DynamicGateway,
    runner::stop_signal::StopSignal,
    scenario::{
        scenario::{DynamicStrategy, Scenario},
        strategies::StrategyKind,
    },
    strategy::instrument_context::{InstrumentContext, WithContext},
    types::market_limits::MarketLimits,
};

/// Consecutive gateway failures after which the market limits are re-fetched,
/// in case the exchange changed its filters under a running worker.
const LIMITS_REFRESH_AFTER: u32 = 3;

/// Counters for one worker's lifetime, logged when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub failures: u64,
}

/// Drives one pair: fetch limits once, then run strategy cycles until the
/// stop flag is raised or a fatal error ends the worker.
pub struct StrategyRunner {
    config: PairConfig,
    kind: StrategyKind,
    gateway: DynamicGateway,
    stop: StopSignal,
}

impl StrategyRunner {
    pub fn new(
        config: PairConfig,
        kind: StrategyKind,
        gateway: DynamicGateway,
        stop: StopSignal,
    ) -> Self {
        Self {
            config,
            kind,
            gateway,
            stop,
        }
    }

    pub async fn run(self) -> Result<RunSummary, StrategyError> {
        let Some(limits) = self.load_limits().await else {
            info!("stopped before market limits were loaded");
            return Ok(RunSummary::default());
        };

        let ctx = InstrumentContext::new(self.config.clone(), limits);
        let strategy = Scenario::strategy(self.kind, ctx, self.gateway.clone()).inspect_err(
            |error| error!(%error, "strategy could not be configured, worker exiting"),
        )?;

        let summary = self.run_loop(strategy).await?;
        info!(
            cycles = summary.cycles,
            failures = summary.failures,
            "worker stopped"
        );

        Ok(summary)
    }

    /// Retries on gateway errors; `None` when stopped first.
    async fn load_limits(&self) -> Option<MarketLimits> {
        let instrument = &self.config.instrument;

        loop {
            if self.stop.is_stopped() {
                return None;
            }

            match self.gateway.market_limits(instrument).await {
                Ok(limits) => match limits.validate() {
                    Ok(()) => {
                        info!(?limits, "market limits loaded");
                        return Some(limits);
                    }
                    Err(error) => warn!(%error, "exchange returned unusable market limits"),
                },
                Err(error) => warn!(%error, "could not load market limits"),
            }

            if self.stop.sleep(self.config.error_backoff).await {
                return None;
            }
        }
    }

    async fn run_loop(&self, mut strategy: DynamicStrategy) -> Result<RunSummary, StrategyError> {
        let mut summary = RunSummary::default();
        let mut gateway_streak = 0;

        info!(strategy = strategy.name(), "worker started");

        while !self.stop.is_stopped() {
            summary.cycles += 1;

            let delay = match strategy.run_cycle(&self.stop).await {
                Ok(outcome) => {
                    gateway_streak = 0;
                    info!(?outcome, "cycle complete");
                    strategy.next_delay(&outcome)
                }
                Err(error) => {
                    summary.failures += 1;

                    if matches!(error, StrategyError::Gateway(_)) {
                        gateway_streak += 1;
                    } else {
                        gateway_streak = 0;
                    }
                    let delay = self.delay_after(error)?;

                    if gateway_streak >= LIMITS_REFRESH_AFTER {
                        gateway_streak = 0;
                        self.refresh_limits(&mut strategy).await?;
                    }

                    delay
                }
            };

            if self.stop.sleep(delay).await {
                break;
            }
        }

        Ok(summary)
    }

    /// Single attempt; a failed fetch keeps the current limits.
    async fn refresh_limits(&self, strategy: &mut DynamicStrategy) -> Result<(), StrategyError> {
        match self.gateway.market_limits(&self.config.instrument).await {
            Ok(limits) => {
                if let Err(error) = limits.validate() {
                    warn!(%error, "refreshed market limits are unusable, keeping the old ones");
                    return Ok(());
                }

                if strategy.ctx_mut().refresh_limits(limits)? {
                    info!(?limits, "market limits changed on the exchange");
                }
            }
            Err(error) => warn!(%error, "could not refresh market limits"),
        }

        Ok(())
    }

    fn delay_after(&self, error: StrategyError) -> Result<Duration, StrategyError> {
        match error.recovery() {
            Recovery::Abort => {
                error!(%error, "fatal error, worker exiting");
                Err(error)
            }
            Recovery::Backoff => {
                warn!(%error, backoff = ?self.config.error_backoff, "cycle failed, backing off");
                Ok(self.config.error_backoff)
            }
            Recovery::SkipCycle => {
                warn!(%error, "skipping cycle");
                Ok(self.config.poll_interval)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::pair_config::SizingMode;
    use crate::execution::order_action::Side;
    use crate::gateway::fake::{Call, FakeGateway};
    use crate::types::instrument::Instrument;

    fn config() -> PairConfig {
        PairConfig::for_test(Instrument::new("ADA", "USDT"))
    }

    fn count(gateway: &FakeGateway, call: &Call) -> usize {
        gateway.calls().iter().filter(|c| *c == call).count()
    }

    #[tokio::test(start_paused = true)]
    async fn no_orders_are_placed_after_stop() {
        let gateway = Arc::new(
            FakeGateway::new(100.0).with_price_path(vec![100.0, 101.0, 102.0, 103.0, 104.0]),
        );
        let (handle, stop) = StopSignal::new();
        let runner = StrategyRunner::new(config(), StrategyKind::MarketMaking, gateway.clone(), stop);

        let worker = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.stop();

        let summary = worker.await.unwrap().unwrap();
        let placed = gateway.placements().len();

        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.failures, 0);
        assert_eq!(placed, 8);
        assert_eq!(gateway.placements().len(), placed);
    }

    #[tokio::test(start_paused = true)]
    async fn gateway_failures_back_off_and_retry() {
        let gateway = Arc::new(FakeGateway::new(100.0));
        gateway.fail("balance");
        let (handle, stop) = StopSignal::new();
        let runner = StrategyRunner::new(config(), StrategyKind::MarketMaking, gateway.clone(), stop);

        let worker = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_secs(12)).await;
        handle.stop();

        let summary = worker.await.unwrap().unwrap();

        // attempts at 0s, 5s and 10s
        assert_eq!(count(&gateway, &Call::Balance), 3);
        assert_eq!(summary.failures, 3);
        assert!(gateway.placements().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sizing_failures_wait_the_poll_interval() {
        let gateway = Arc::new(FakeGateway::new(100.0).with_balance(0.0));
        let mut config = config();
        config.sizing = SizingMode::BalanceFraction(0.5);
        let (handle, stop) = StopSignal::new();
        let runner = StrategyRunner::new(config, StrategyKind::MarketMaking, gateway.clone(), stop);

        let worker = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_secs(45)).await;
        handle.stop();

        let summary = worker.await.unwrap().unwrap();

        // attempts at 0s and 30s
        assert_eq!(summary.failures, 2);
        assert_eq!(count(&gateway, &Call::Balance), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn configuration_error_ends_only_this_worker() {
        let gateway = Arc::new(FakeGateway::new(100.0));
        let mut config = config();
        config.spread = 0.001;
        let (_handle, stop) = StopSignal::new();
        let runner = StrategyRunner::new(config, StrategyKind::MarketMaking, gateway.clone(), stop);

        let error = runner.run().await.unwrap_err();

        assert!(matches!(error, StrategyError::Configuration(_)));
        assert_eq!(gateway.calls(), vec![Call::MarketLimits]);
    }

    #[tokio::test(start_paused = true)]
    async fn limits_are_retried_until_stopped() {
        let gateway = Arc::new(FakeGateway::new(100.0));
        gateway.fail("market_limits");
        let (handle, stop) = StopSignal::new();
        let runner = StrategyRunner::new(config(), StrategyKind::Scalping, gateway.clone(), stop);

        let worker = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_secs(7)).await;
        handle.stop();

        let summary = worker.await.unwrap().unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(count(&gateway, &Call::MarketLimits), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scalping_trade_value_below_exchange_floor_ends_the_worker() {
        let gateway = Arc::new(FakeGateway::new(100.0));
        let mut config = config();
        config.sizing = SizingMode::FixedNotional(4.0);
        let (_handle, stop) = StopSignal::new();
        let runner = StrategyRunner::new(config, StrategyKind::Scalping, gateway.clone(), stop);

        let error = runner.run().await.unwrap_err();

        assert!(matches!(error, StrategyError::Configuration(_)));
        assert!(gateway.placements().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_gateway_failures_refresh_the_limits() {
        let gateway = Arc::new(FakeGateway::new(100.7));
        gateway.fail("balance");
        let (handle, stop) = StopSignal::new();
        let runner = StrategyRunner::new(config(), StrategyKind::MarketMaking, gateway.clone(), stop);

        let worker = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        gateway.set_limits(MarketLimits {
            min_amount: 0.001,
            min_notional: 5.0,
            amount_step: 0.001,
            price_tick: 0.01,
        });

        // third failure at 10s triggers the refresh
        tokio::time::sleep(Duration::from_secs(11)).await;
        gateway.recover("balance");
        tokio::time::sleep(Duration::from_secs(4)).await;
        handle.stop();

        worker.await.unwrap().unwrap();

        assert_eq!(count(&gateway, &Call::MarketLimits), 2);
        // 6 / 100.7 = 0.0595..., truncated on the refreshed step
        assert!(matches!(
            gateway.placements().first(),
            Some(Call::PlaceLimit { side: Side::Buy, quantity, .. }) if *quantity == 0.059
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn refreshed_limits_above_the_trade_value_end_the_worker() {
        let gateway = Arc::new(FakeGateway::new(100.0));
        gateway.fail("balance");
        let (_handle, stop) = StopSignal::new();
        let runner = StrategyRunner::new(config(), StrategyKind::MarketMaking, gateway.clone(), stop);

        let worker = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        gateway.set_limits(MarketLimits {
            min_amount: 0.01,
            min_notional: 10.0,
            amount_step: 0.01,
            price_tick: 0.01,
        });

        let error = worker.await.unwrap().unwrap_err();

        assert!(matches!(error, StrategyError::Configuration(_)));
        assert_eq!(count(&gateway, &Call::MarketLimits), 2);
    }
}
