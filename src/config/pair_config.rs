use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};

use crate::types::instrument::Instrument;

/// How a worker turns its intent into an order size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingMode {
    /// Spend a fixed quote value per order (e.g. 6 USDT).
    FixedNotional(f64),
    /// Spend a fraction of the free quote balance per order.
    BalanceFraction(f64),
    /// Trade a fixed base amount per order.
    FixedAmount(f64),
}

impl SizingMode {
    pub fn validate(&self) -> Result<()> {
        match *self {
            SizingMode::FixedNotional(value) if value <= 0.0 => {
                bail!("fixed trade value must be > 0, got {value}")
            }
            SizingMode::BalanceFraction(fraction) if fraction <= 0.0 || fraction > 1.0 => {
                bail!("balance fraction must be in (0, 1], got {fraction}")
            }
            SizingMode::FixedAmount(amount) if amount <= 0.0 => {
                bail!("fixed trade amount must be > 0, got {amount}")
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingKind {
    FixedNotional,
    BalanceFraction,
    FixedAmount,
}

impl fmt::Display for SizingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedNotional => write!(f, "fixed-notional"),
            Self::BalanceFraction => write!(f, "balance-fraction"),
            Self::FixedAmount => write!(f, "fixed-amount"),
        }
    }
}

impl FromStr for SizingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed-notional" | "fixed-value" | "fixed" => Ok(Self::FixedNotional),
            "balance-fraction" | "balance" => Ok(Self::BalanceFraction),
            "fixed-amount" | "amount" => Ok(Self::FixedAmount),
            other => Err(anyhow!("unknown sizing mode: {other}")),
        }
    }
}

/// Everything one worker needs to trade its pair. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct PairConfig {
    pub instrument: Instrument,
    /// Taker/maker fee as a fraction (0.001 = 0.1%).
    pub fee_rate: f64,
    /// Offset of each quote from the current price, as a fraction.
    pub spread: f64,
    pub sizing: SizingMode,
    pub stop_loss_fraction: f64,
    pub profit_target_fraction: f64,
    pub poll_interval: Duration,
    /// Number of closes in the trend moving average.
    pub trend_window: usize,
    /// Candle timeframe for the trend, e.g. `5m`.
    pub trend_timeframe: String,
    pub scalp_tick_interval: Duration,
    pub scalp_cooldown: Duration,
    /// Wait after a gateway failure before retrying the cycle.
    pub error_backoff: Duration,
    /// Re-quote threshold as a fraction of the current price.
    pub price_tolerance: f64,
}

impl PairConfig {
    pub fn validate(&self) -> Result<()> {
        self.sizing.validate()?;

        if !(0.0..1.0).contains(&self.fee_rate) {
            bail!("fee rate must be in [0, 1), got {}", self.fee_rate);
        }
        if self.spread <= 0.0 || self.spread + self.fee_rate >= 1.0 {
            bail!("spread must be > 0 and spread + fee < 1, got {}", self.spread);
        }
        if !(0.0..1.0).contains(&self.stop_loss_fraction) || self.stop_loss_fraction == 0.0 {
            bail!("stop-loss fraction must be in (0, 1), got {}", self.stop_loss_fraction);
        }
        if self.profit_target_fraction <= 0.0 {
            bail!("profit target fraction must be > 0, got {}", self.profit_target_fraction);
        }
        if self.trend_window < 2 {
            bail!("trend window must be at least 2, got {}", self.trend_window);
        }
        if self.trend_timeframe.trim().is_empty() {
            bail!("trend timeframe must not be empty");
        }
        if self.price_tolerance < 0.0 {
            bail!("price tolerance must be >= 0");
        }
        for (name, interval) in [
            ("poll interval", self.poll_interval),
            ("scalp tick interval", self.scalp_tick_interval),
            ("error backoff", self.error_backoff),
        ] {
            if interval.is_zero() {
                bail!("{name} must be > 0");
            }
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn for_test(instrument: Instrument) -> Self {
        Self {
            instrument,
            fee_rate: 0.001,
            spread: 0.025,
            sizing: SizingMode::FixedNotional(6.0),
            stop_loss_fraction: 0.015,
            profit_target_fraction: 0.005,
            poll_interval: Duration::from_secs(30),
            trend_window: 5,
            trend_timeframe: "5m".to_string(),
            scalp_tick_interval: Duration::from_secs(5),
            scalp_cooldown: Duration::from_secs(60),
            error_backoff: Duration::from_secs(5),
            price_tolerance: 0.001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_config_is_valid() {
        assert!(PairConfig::for_test(Instrument::new("ADA", "USDT")).validate().is_ok());
    }

    #[test]
    fn rejects_short_trend_window() {
        let mut config = PairConfig::for_test(Instrument::new("ADA", "USDT"));
        config.trend_window = 1;

        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_balance_fraction() {
        assert!(SizingMode::BalanceFraction(1.5).validate().is_err());
        assert!(SizingMode::BalanceFraction(0.0).validate().is_err());
        assert!(SizingMode::BalanceFraction(0.25).validate().is_ok());
    }

    #[test]
    fn parses_sizing_kind_aliases() {
        assert_eq!("balance".parse::<SizingKind>().unwrap(), SizingKind::BalanceFraction);
        assert_eq!("FIXED-NOTIONAL".parse::<SizingKind>().unwrap(), SizingKind::FixedNotional);
        assert!("martingale".parse::<SizingKind>().is_err());
    }
}
