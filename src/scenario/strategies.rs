use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    #[clap(name = "market-making")]
    MarketMaking,
    #[clap(name = "scalping")]
    Scalping,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarketMaking => write!(f, "market-making"),
            Self::Scalping => write!(f, "scalping"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "market-making" | "mm" => Ok(Self::MarketMaking),
            "scalping" | "scalp" => Ok(Self::Scalping),
            other => Err(anyhow!("unknown strategy kind: {other}")),
        }
    }
}
