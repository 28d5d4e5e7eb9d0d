use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VenueKind {
    #[clap(name = "dry-run")]
    DryRun,
    Binance,
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry-run"),
            Self::Binance => write!(f, "binance"),
        }
    }
}

impl FromStr for VenueKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dry-run" | "dryrun" | "paper" => Ok(Self::DryRun),
            "binance" => Ok(Self::Binance),
            other => Err(anyhow!("unknown venue kind: {other}")),
        }
    }
}
