use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::config::pair_config::{PairConfig, SizingKind, SizingMode};
use crate::types::instrument::Instrument;

const DEFAULT_PAIRS: &str = "ADA/USDT,CKB/USDT,BTC/USDT";

/// Process-wide settings read once from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub pairs: Vec<Instrument>,
    pub startup_stagger: Duration,
    defaults: PairDefaults,
}

#[derive(Debug, Clone)]
struct PairDefaults {
    fee_rate: f64,
    spread: f64,
    sizing_kind: SizingKind,
    fixed_trade_value: f64,
    balance_fraction: f64,
    fixed_trade_amount: f64,
    stop_loss_fraction: f64,
    profit_target_fraction: f64,
    poll_interval: Duration,
    trend_window: usize,
    trend_timeframe: String,
    scalp_tick_interval: Duration,
    scalp_cooldown: Duration,
    error_backoff: Duration,
    price_tolerance: f64,
}

/// Per-pair overrides from `pairs.yml`; any field left out uses the environment default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PairOverrides {
    pub fee_rate: Option<f64>,
    pub spread: Option<f64>,
    pub sizing_mode: Option<String>,
    pub fixed_trade_value: Option<f64>,
    pub balance_fraction: Option<f64>,
    pub fixed_trade_amount: Option<f64>,
    pub stop_loss_fraction: Option<f64>,
    pub profit_target_fraction: Option<f64>,
    pub poll_interval_secs: Option<f64>,
    pub trend_window: Option<usize>,
    pub trend_timeframe: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OverridesFile {
    #[serde(default)]
    pairs: HashMap<String, PairOverrides>,
}

static OVERRIDES: OnceCell<HashMap<String, PairOverrides>> = OnceCell::new();

impl Settings {
    const OVERRIDES_FILE: &'static str = "pairs.yml";

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pairs = lookup("TRADING_PAIRS")
            .unwrap_or_else(|| DEFAULT_PAIRS.to_string())
            .split(',')
            .filter(|symbol| !symbol.trim().is_empty())
            .map(Instrument::from_str)
            .collect::<Result<Vec<_>>>()
            .context("invalid TRADING_PAIRS")?;

        if pairs.is_empty() {
            bail!("TRADING_PAIRS must name at least one pair");
        }

        let defaults = PairDefaults {
            fee_rate: parse_or(&lookup, "TRADING_FEE", 0.001)?,
            spread: parse_or(&lookup, "SPREAD_PERCENTAGE", 0.025)?,
            sizing_kind: parse_or(&lookup, "SIZING_MODE", SizingKind::FixedNotional)?,
            fixed_trade_value: parse_or(&lookup, "FIXED_TRADE_VALUE", 6.0)?,
            balance_fraction: parse_or(&lookup, "BALANCE_FRACTION", 0.1)?,
            fixed_trade_amount: parse_or(&lookup, "FIXED_TRADE_AMOUNT", 0.0)?,
            stop_loss_fraction: parse_or(&lookup, "STOP_LOSS_PERCENTAGE", 0.015)?,
            profit_target_fraction: parse_or(&lookup, "PROFIT_TARGET_PERCENTAGE", 0.005)?,
            poll_interval: seconds_or(&lookup, "TRADE_INTERVAL", 30.0)?,
            trend_window: parse_or(&lookup, "TREND_WINDOW", 5)?,
            trend_timeframe: lookup("MOVING_AVERAGE_TIMEFRAME")
                .or_else(|| lookup("MOVING_EMA_TIMEFRAME"))
                .unwrap_or_else(|| "5m".into()),
            scalp_tick_interval: seconds_or(&lookup, "SCALP_TICK_INTERVAL", 5.0)?,
            scalp_cooldown: seconds_or(&lookup, "SCALP_COOLDOWN", 60.0)?,
            error_backoff: seconds_or(&lookup, "ERROR_BACKOFF", 5.0)?,
            price_tolerance: parse_or(&lookup, "PRICE_TOLERANCE", 0.001)?,
        };

        Ok(Self {
            pairs,
            startup_stagger: seconds_or(&lookup, "STARTUP_STAGGER", 5.0)?,
            defaults,
        })
    }

    pub fn with_pairs(mut self, pairs: Vec<Instrument>) -> Self {
        if !pairs.is_empty() {
            self.pairs = pairs;
        }
        self
    }

    /// Config for one pair: environment defaults, then `pairs.yml` overrides.
    pub fn pair_config(&self, instrument: &Instrument) -> Result<PairConfig> {
        let overrides = load_overrides()?
            .get(&instrument.to_string())
            .cloned()
            .unwrap_or_default();

        self.pair_config_with(instrument, &overrides)
    }

    pub fn pair_config_with(
        &self,
        instrument: &Instrument,
        overrides: &PairOverrides,
    ) -> Result<PairConfig> {
        let defaults = &self.defaults;

        let sizing_kind = match &overrides.sizing_mode {
            Some(kind) => kind.parse()?,
            None => defaults.sizing_kind,
        };
        let sizing = match sizing_kind {
            SizingKind::FixedNotional => SizingMode::FixedNotional(
                overrides
                    .fixed_trade_value
                    .unwrap_or(defaults.fixed_trade_value),
            ),
            SizingKind::BalanceFraction => SizingMode::BalanceFraction(
                overrides
                    .balance_fraction
                    .unwrap_or(defaults.balance_fraction),
            ),
            SizingKind::FixedAmount => SizingMode::FixedAmount(
                overrides
                    .fixed_trade_amount
                    .unwrap_or(defaults.fixed_trade_amount),
            ),
        };

        let poll_interval = match overrides.poll_interval_secs {
            Some(secs) => seconds(secs).context("invalid poll_interval_secs")?,
            None => defaults.poll_interval,
        };

        let config = PairConfig {
            instrument: instrument.clone(),
            fee_rate: overrides.fee_rate.unwrap_or(defaults.fee_rate),
            spread: overrides.spread.unwrap_or(defaults.spread),
            sizing,
            stop_loss_fraction: overrides
                .stop_loss_fraction
                .unwrap_or(defaults.stop_loss_fraction),
            profit_target_fraction: overrides
                .profit_target_fraction
                .unwrap_or(defaults.profit_target_fraction),
            poll_interval,
            trend_window: overrides.trend_window.unwrap_or(defaults.trend_window),
            trend_timeframe: overrides
                .trend_timeframe
                .clone()
                .unwrap_or_else(|| defaults.trend_timeframe.clone()),
            scalp_tick_interval: defaults.scalp_tick_interval,
            scalp_cooldown: defaults.scalp_cooldown,
            error_backoff: defaults.error_backoff,
            price_tolerance: defaults.price_tolerance,
        };

        config
            .validate()
            .with_context(|| format!("invalid configuration for {instrument}"))?;

        Ok(config)
    }
}

fn load_overrides() -> Result<&'static HashMap<String, PairOverrides>> {
    OVERRIDES.get_or_try_init(|| {
        let path = Path::new(Settings::OVERRIDES_FILE);
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read pair overrides {}", Settings::OVERRIDES_FILE))?;

        parse_overrides(&raw)
            .with_context(|| format!("failed to parse pair overrides {}", Settings::OVERRIDES_FILE))
    })
}

fn parse_overrides(raw: &str) -> Result<HashMap<String, PairOverrides>> {
    let file: OverridesFile = serde_yaml::from_str(raw)?;

    // normalise keys so `ada/usdt` and `ADA/USDT` both match
    file.pairs
        .into_iter()
        .map(|(symbol, overrides)| {
            let instrument = Instrument::from_str(&symbol)?;
            Ok((instrument.to_string(), overrides))
        })
        .collect()
}

pub(crate) fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|error| anyhow!("invalid {key}={raw}: {error}")),
        _ => Ok(default),
    }
}

fn seconds_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default_secs: f64,
) -> Result<Duration> {
    let secs: f64 = parse_or(lookup, key, default_secs)?;

    seconds(secs).with_context(|| format!("invalid {key}"))
}

fn seconds(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| anyhow!("{secs} is not a valid duration in seconds"))
}

/// Reads the sandbox switch the way the environment has always spelled it.
pub fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(value) => matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}
