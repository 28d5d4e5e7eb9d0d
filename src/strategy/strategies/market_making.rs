use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    error::StrategyError,
    execution::{
        order_action::{OrderAction, Side},
        order_executor::OrderExecutor,
        order_reconciler::OrderReconciler,
        order_report::OrderReport,
        types::OpenOrder,
    },
    gateway::DynamicGateway,
    runner::stop_signal::StopSignal,
    signals::trend_detector::{Trend, TrendDetector},
    strategy::{
        instrument_context::{InstrumentContext, WithContext},
        position_sizer::validate_sizing,
        price_calculator::validate_spread,
        strategy::{CycleOutcome, Strategy},
        strategy_helpers::StrategyHelpers,
    },
    types::{balance::Balance, quote_target::QuoteTarget},
};

/// Keeps one buy below and one sell above the current price, and steps away
/// from the book entirely while the short-term trend points down.
pub struct MarketMakingStrategy {
    ctx: InstrumentContext,
    gateway: DynamicGateway,
    executor: OrderExecutor,
    reconciler: OrderReconciler,
    trend: TrendDetector,
}

impl MarketMakingStrategy {
    pub fn new(ctx: InstrumentContext, gateway: DynamicGateway) -> Result<Self, StrategyError> {
        let config = ctx.config();
        validate_spread(config.spread, config.fee_rate)?;
        validate_sizing(config.sizing, ctx.limits())?;

        let reconciler = OrderReconciler::new(ctx.instrument().clone(), config.price_tolerance);
        let trend = TrendDetector::new(config.trend_window);

        Ok(Self {
            executor: OrderExecutor::new(gateway.clone()),
            ctx,
            gateway,
            reconciler,
            trend,
        })
    }

    async fn detect_trend(&self) -> Trend {
        let config = self.ctx.config();

        match self
            .gateway
            .closes(self.ctx.instrument(), &config.trend_timeframe, self.trend.window())
            .await
        {
            Ok(closes) => self.trend.detect_or_neutral(&closes),
            Err(error) => {
                warn!(%error, "could not fetch candles, assuming neutral trend");
                Trend::Neutral
            }
        }
    }

    async fn de_risk(&self) -> Result<CycleOutcome, StrategyError> {
        let open_orders = self.executor.fetch_open_orders(self.ctx.instrument()).await?;
        let actions = self.reconciler.cancel_all(&open_orders);

        info!(
            open = open_orders.len(),
            cancelling = actions.len(),
            "downward trend detected, pulling quotes"
        );

        let reports = self.executor.execute(&actions).await?;

        Ok(CycleOutcome::DeRisked {
            cancelled: reports.iter().filter(|r| r.is_cancelled()).count(),
        })
    }

    async fn quote(&self, balance: &Balance) -> Result<CycleOutcome, StrategyError> {
        let instrument = self.ctx.instrument();
        let snapshot = self.gateway.snapshot(instrument).await?;
        let current = snapshot.last;

        let size = self.order_size(balance, current)?;
        let target = self.quote_target(current, size);

        info!(
            price = %current,
            book_spread = snapshot.spread(),
            bid = %target.bid.price,
            ask = %target.ask.price,
            size,
            "quote target"
        );

        let open_orders = self.executor.fetch_open_orders(instrument).await?;
        let actions = self.reconciler.reconcile(&open_orders, &target, current);

        ensure_bid_is_funded(&actions, &open_orders, balance, &target)?;

        let reports = self.executor.execute(&actions).await?;

        Ok(summarize(&reports))
    }
}

/// A new bid can only be funded by free quote plus whatever the cancelled bids release.
fn ensure_bid_is_funded(
    actions: &[OrderAction],
    open_orders: &[OpenOrder],
    balance: &Balance,
    target: &QuoteTarget,
) -> Result<(), StrategyError> {
    let places_bid = actions
        .iter()
        .any(|action| action.is_place() && action.side() == Side::Buy);
    if !places_bid {
        return Ok(());
    }

    let released: f64 = actions
        .iter()
        .filter_map(|action| match action {
            OrderAction::Cancel { order_id, side: Side::Buy, .. } => open_orders
                .iter()
                .find(|order| &order.order_id == order_id)
                .map(|order| order.price.as_f64() * order.quantity),
            _ => None,
        })
        .sum();

    let available = balance.free + released;
    let required = target.bid.notional();

    if available < required {
        return Err(StrategyError::InsufficientBalance {
            available,
            required,
        });
    }

    Ok(())
}

fn summarize(reports: &[OrderReport]) -> CycleOutcome {
    CycleOutcome::Quoted {
        placed: reports.iter().filter(|r| r.is_placed()).count(),
        cancelled: reports.iter().filter(|r| r.is_cancelled()).count(),
    }
}

impl WithContext for MarketMakingStrategy {
    fn ctx(&self) -> &InstrumentContext {
        &self.ctx
    }

    fn ctx_mut(&mut self) -> &mut InstrumentContext {
        &mut self.ctx
    }
}

#[async_trait]
impl Strategy for MarketMakingStrategy {
    fn name(&self) -> &'static str {
        "market-making"
    }

    async fn run_cycle(&mut self, _stop: &StopSignal) -> Result<CycleOutcome, StrategyError> {
        let balance = self.gateway.balance(self.ctx.instrument()).await?;
        info!(free = balance.free, locked = balance.locked, "balance refreshed");

        match self.detect_trend().await {
            Trend::Downward => self.de_risk().await,
            Trend::Neutral => self.quote(&balance).await,
        }
    }

    fn next_delay(&self, _outcome: &CycleOutcome) -> Duration {
        self.ctx.config().poll_interval
    }
}
