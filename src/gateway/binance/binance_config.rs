use std::env;

use crate::config::settings::parse_flag;

const LIVE_URL: &str = "https://api.binance.com";
const SANDBOX_URL: &str = "https://testnet.binance.vision";

pub struct BinanceConfig {
    pub api_key: String,
    pub api_secret: String,
    pub sandbox: bool,
}

impl BinanceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("API_KEY").map_err(|_| anyhow::anyhow!("API_KEY not set"))?;

        let api_secret =
            env::var("API_SECRET").map_err(|_| anyhow::anyhow!("API_SECRET not set"))?;

        let sandbox = parse_flag(env::var("SANDBOX_MODE").ok(), true);

        Ok(Self {
            api_key,
            api_secret,
            sandbox,
        })
    }

    pub fn base_url(&self) -> &'static str {
        if self.sandbox { SANDBOX_URL } else { LIVE_URL }
    }
}

impl std::fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("api_key", &"<redacted>")
            .field("sandbox", &self.sandbox)
            .finish()
    }
}
