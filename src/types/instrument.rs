use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};

/// A spot trading pair such as `ADA/USDT`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Instrument {
    base: String,
    quote: String,
}

impl Instrument {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().trim().to_uppercase(),
            quote: quote.into().trim().to_uppercase(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Exchange symbol without separator, e.g. `ADAUSDT`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl FromStr for Instrument {
    type Err = anyhow::Error;

    fn from_str(symbol: &str) -> Result<Self> {
        if let Some((base, quote)) = symbol.trim().split_once('/') {
            if base.trim().is_empty() || quote.trim().is_empty() {
                bail!("invalid instrument symbol: {symbol}");
            }

            return Ok(Self::new(base, quote));
        }

        bail!("invalid instrument symbol: {symbol}");
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.base, self.quote)
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instrument({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slash_separated_symbol() {
        let instrument: Instrument = "ada/usdt".parse().unwrap();

        assert_eq!(instrument.base(), "ADA");
        assert_eq!(instrument.quote(), "USDT");
        assert_eq!(instrument.symbol(), "ADAUSDT");
        assert_eq!(instrument.to_string(), "ADA/USDT");
    }

    #[test]
    fn rejects_symbol_without_separator() {
        assert!("ADAUSDT".parse::<Instrument>().is_err());
        assert!("/USDT".parse::<Instrument>().is_err());
    }
}
