use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    error::StrategyError,
    execution::order_action::Side,
    gateway::DynamicGateway,
    runner::stop_signal::StopSignal,
    strategy::{
        instrument_context::{InstrumentContext, WithContext},
        position_sizer::validate_sizing,
        scalp_monitor::{ScalpMonitor, ScalpPosition},
        strategy::{CycleOutcome, Strategy},
        strategy_helpers::StrategyHelpers,
    },
    types::price::Price,
};

/// Buys at market, then watches the price until it reaches the profit target
/// or the stop-loss and sells at market. One position per pair at a time; the
/// worker is busy for the whole round.
pub struct ScalpingStrategy {
    ctx: InstrumentContext,
    gateway: DynamicGateway,
    monitor: ScalpMonitor,
}

impl ScalpingStrategy {
    pub fn new(ctx: InstrumentContext, gateway: DynamicGateway) -> Result<Self, StrategyError> {
        validate_sizing(ctx.config().sizing, ctx.limits())?;

        let monitor = ScalpMonitor::new(
            ctx.config().stop_loss_fraction,
            ctx.config().profit_target_fraction,
        );

        Ok(Self {
            ctx,
            gateway,
            monitor,
        })
    }

    pub fn monitor(&self) -> &ScalpMonitor {
        &self.monitor
    }

    async fn enter(&mut self) -> Result<(), StrategyError> {
        let instrument = self.ctx.instrument();

        let balance = self.gateway.balance(instrument).await?;
        let snapshot = self.gateway.snapshot(instrument).await?;
        let size = self.scalp_entry_size(&balance, snapshot.last)?;

        let fill = self
            .gateway
            .place_market_order(instrument, Side::Buy, size)
            .await?;

        let entry = if fill.price.as_f64() > 0.0 {
            fill.price
        } else {
            snapshot.last
        };
        let held = self.sellable_amount(fill.quantity);

        self.monitor.open(entry, held);

        if let ScalpPosition::Open {
            stop_loss, target, ..
        } = self.monitor.position()
        {
            info!(
                %entry,
                size = held,
                cost = fill.cost,
                %stop_loss,
                %target,
                "scalp position opened"
            );
        }

        Ok(())
    }

    async fn exit(&mut self, price: Price) -> Result<Option<CycleOutcome>, StrategyError> {
        let Some(trigger) = self.monitor.evaluate(price) else {
            debug!(%price, "holding scalp position");
            return Ok(None);
        };

        let ScalpPosition::Open { size, .. } = self.monitor.position() else {
            return Ok(None);
        };

        let fill = self
            .gateway
            .place_market_order(self.ctx.instrument(), Side::Sell, size)
            .await?;

        let exit_price = if fill.price.as_f64() > 0.0 {
            fill.price
        } else {
            price
        };

        let Some(exit) = self.monitor.close(trigger, exit_price) else {
            return Ok(None);
        };

        info!(
            %trigger,
            entry = %exit.entry,
            exit = %exit.exit,
            size = exit.size,
            gross_pnl = exit.gross_pnl(),
            rounds = self.monitor.stats().rounds,
            total_gross_pnl = self.monitor.stats().gross_pnl,
            "scalp position closed"
        );

        Ok(Some(CycleOutcome::ScalpClosed(exit)))
    }
}

impl WithContext for ScalpingStrategy {
    fn ctx(&self) -> &InstrumentContext {
        &self.ctx
    }

    fn ctx_mut(&mut self) -> &mut InstrumentContext {
        &mut self.ctx
    }
}

#[async_trait]
impl Strategy for ScalpingStrategy {
    fn name(&self) -> &'static str {
        "scalping"
    }

    async fn run_cycle(&mut self, stop: &StopSignal) -> Result<CycleOutcome, StrategyError> {
        // a position left open by an interrupted or failed round is resumed, never re-entered
        if !self.monitor.is_open() {
            self.enter().await?;
        }

        let tick = self.ctx.config().scalp_tick_interval;

        loop {
            if stop.sleep(tick).await {
                warn!(
                    position = ?self.monitor.position(),
                    "stop requested while scalp position is open"
                );
                return Ok(CycleOutcome::ScalpInterrupted);
            }

            let snapshot = self.gateway.snapshot(self.ctx.instrument()).await?;

            if let Some(outcome) = self.exit(snapshot.last).await? {
                return Ok(outcome);
            }
        }
    }

    fn next_delay(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::ScalpClosed(_) => self.ctx.config().scalp_cooldown,
            _ => self.ctx.config().poll_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::pair_config::PairConfig;
    use crate::gateway::fake::{Call, FakeGateway};
    use crate::strategy::scalp_monitor::ExitTrigger;
    use crate::types::{instrument::Instrument, market_limits::MarketLimits};

    fn limits() -> MarketLimits {
        MarketLimits {
            min_amount: 0.01,
            min_notional: 5.0,
            amount_step: 0.01,
            price_tick: 0.01,
        }
    }

    fn context() -> InstrumentContext {
        let mut config = PairConfig::for_test(Instrument::new("ADA", "USDT"));
        config.fee_rate = 0.0;

        InstrumentContext::new(config, limits())
    }

    fn market_calls(gateway: &FakeGateway) -> Vec<Call> {
        gateway.placements()
    }

    #[tokio::test(start_paused = true)]
    async fn exits_at_target() {
        let gateway = Arc::new(FakeGateway::new(100.0).with_price_path(vec![
            100.0, // entry snapshot
            99.0,  // neither
            100.6, // target
        ]));
        let mut strategy = ScalpingStrategy::new(context(), gateway.clone()).unwrap();
        let (_handle, stop) = StopSignal::new();

        let outcome = strategy.run_cycle(&stop).await.unwrap();

        let CycleOutcome::ScalpClosed(exit) = outcome else {
            panic!("expected a closed round, got {outcome:?}");
        };
        assert_eq!(exit.trigger, ExitTrigger::Target);
        assert_eq!(exit.entry, Price::new(100.0));
        assert!(!strategy.monitor().is_open());
        assert_eq!(
            market_calls(&gateway),
            vec![
                Call::PlaceMarket {
                    side: Side::Buy,
                    quantity: 0.06
                },
                Call::PlaceMarket {
                    side: Side::Sell,
                    quantity: 0.06
                },
            ]
        );
        assert_eq!(strategy.next_delay(&outcome), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn exits_at_stop_loss() {
        let gateway = Arc::new(FakeGateway::new(100.0).with_price_path(vec![100.0, 98.4]));
        let mut strategy = ScalpingStrategy::new(context(), gateway.clone()).unwrap();
        let (_handle, stop) = StopSignal::new();

        let outcome = strategy.run_cycle(&stop).await.unwrap();

        assert!(matches!(
            outcome,
            CycleOutcome::ScalpClosed(exit) if exit.trigger == ExitTrigger::StopLoss
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_loss_exit_after_fees_clears_the_notional_floor() {
        let ctx = InstrumentContext::new(PairConfig::for_test(Instrument::new("ADA", "USDT")), limits());
        let gateway = Arc::new(FakeGateway::new(100.0).with_price_path(vec![100.0, 98.4]));
        let mut strategy = ScalpingStrategy::new(ctx, gateway.clone()).unwrap();
        let (_handle, stop) = StopSignal::new();

        let outcome = strategy.run_cycle(&stop).await.unwrap();

        assert!(matches!(
            outcome,
            CycleOutcome::ScalpClosed(exit) if exit.trigger == ExitTrigger::StopLoss
        ));
        // 0.06 would leave 0.05 after the fee, worth 4.92 at the exit
        assert_eq!(
            market_calls(&gateway),
            vec![
                Call::PlaceMarket {
                    side: Side::Buy,
                    quantity: 0.07
                },
                Call::PlaceMarket {
                    side: Side::Sell,
                    quantity: 0.06
                },
            ]
        );
    }

    #[test]
    fn trade_value_below_exchange_floor_is_rejected_at_construction() {
        let mut ctx = context();
        ctx.config.sizing = crate::config::pair_config::SizingMode::FixedNotional(4.0);

        let result = ScalpingStrategy::new(ctx, Arc::new(FakeGateway::new(100.0)));

        assert!(matches!(result, Err(StrategyError::Configuration(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn sizing_failure_leaves_no_position() {
        let gateway = Arc::new(FakeGateway::new(100.0).with_balance(0.0));
        let mut strategy = ScalpingStrategy::new(context(), gateway.clone()).unwrap();
        let (_handle, stop) = StopSignal::new();

        let error = strategy.run_cycle(&stop).await.unwrap_err();

        assert!(matches!(error, StrategyError::SizingFailed(_)));
        assert!(!strategy.monitor().is_open());
        assert!(market_calls(&gateway).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn open_position_is_resumed_not_reentered() {
        let gateway = Arc::new(FakeGateway::new(100.0).with_price_path(vec![100.0, 100.6]));
        let mut strategy = ScalpingStrategy::new(context(), gateway.clone()).unwrap();
        let (_handle, stop) = StopSignal::new();
        strategy.enter().await.unwrap();

        let outcome = strategy.run_cycle(&stop).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::ScalpClosed(_)));
        let buys = market_calls(&gateway)
            .into_iter()
            .filter(|call| matches!(call, Call::PlaceMarket { side: Side::Buy, .. }))
            .count();
        assert_eq!(buys, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_keeps_the_position_open() {
        let gateway = Arc::new(FakeGateway::new(100.0));
        let mut strategy = ScalpingStrategy::new(context(), gateway.clone()).unwrap();
        let (_handle, stop) = StopSignal::new();
        strategy.enter().await.unwrap();
        gateway.fail("snapshot");

        let error = strategy.run_cycle(&stop).await.unwrap_err();

        assert!(matches!(error, StrategyError::Gateway(_)));
        assert!(strategy.monitor().is_open());
        assert_eq!(market_calls(&gateway).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_interrupts_monitoring_without_selling() {
        let gateway = Arc::new(FakeGateway::new(100.0));
        let mut strategy = ScalpingStrategy::new(context(), gateway.clone()).unwrap();
        let (handle, stop) = StopSignal::new();

        let round = tokio::spawn(async move {
            let outcome = strategy.run_cycle(&stop).await;
            (strategy, outcome)
        });
        tokio::time::sleep(Duration::from_secs(12)).await;
        handle.stop();

        let (strategy, outcome) = round.await.unwrap();

        assert_eq!(outcome.unwrap(), CycleOutcome::ScalpInterrupted);
        assert!(strategy.monitor().is_open());
        assert_eq!(market_calls(&gateway).len(), 1);
    }
}
