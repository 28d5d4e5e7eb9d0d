use anyhow::{Context, Result, anyhow, bail};
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use sha2::Sha256;
use url::form_urlencoded;

use crate::execution::order_action::Side;
use crate::gateway::binance::binance_config::BinanceConfig;
use crate::types::{instrument::Instrument, price::Price};

type HmacSha256 = Hmac<Sha256>;

const RECV_WINDOW_MS: &str = "5000";

/// Thin REST client for the Binance spot API.
#[derive(Clone, Debug)]
pub struct BinanceClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl BinanceClient {
    pub fn new(config: BinanceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            api_key: config.api_key,
            api_secret: config.api_secret,
        })
    }

    pub async fn ticker(&self, instrument: &Instrument) -> Result<Ticker> {
        let params = vec![("symbol".to_string(), instrument.symbol())];

        self.public_get("/api/v3/ticker/24hr", &params).await
    }

    /// Closing prices of the last `limit` candles, oldest first.
    pub async fn closes(
        &self,
        instrument: &Instrument,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<f64>> {
        let params = vec![
            ("symbol".to_string(), instrument.symbol()),
            ("interval".to_string(), interval.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];

        let klines: Vec<Vec<serde_json::Value>> = self.public_get("/api/v3/klines", &params).await?;

        klines
            .iter()
            .map(|kline| {
                kline
                    .get(4)
                    .and_then(|close| close.as_str())
                    .ok_or_else(|| anyhow!("kline without close price: {kline:?}"))?
                    .parse::<f64>()
                    .context("invalid close price")
            })
            .collect()
    }

    pub async fn exchange_info(&self, instrument: &Instrument) -> Result<SymbolInfo> {
        let params = vec![("symbol".to_string(), instrument.symbol())];

        let info: ExchangeInfo = self.public_get("/api/v3/exchangeInfo", &params).await?;

        info.symbols
            .into_iter()
            .find(|symbol| symbol.symbol == instrument.symbol())
            .ok_or_else(|| anyhow!("{instrument} is not listed"))
    }

    pub async fn account(&self) -> Result<Account> {
        self.signed(Method::GET, "/api/v3/account", Vec::new()).await
    }

    pub async fn open_orders(&self, instrument: &Instrument) -> Result<Vec<OrderResult>> {
        let params = vec![("symbol".to_string(), instrument.symbol())];

        self.signed(Method::GET, "/api/v3/openOrders", params).await
    }

    pub async fn order(&self, instrument: &Instrument, order_id: &str) -> Result<OrderResult> {
        let params = vec![
            ("symbol".to_string(), instrument.symbol()),
            ("orderId".to_string(), order_id.to_string()),
        ];

        self.signed(Method::GET, "/api/v3/order", params).await
    }

    pub async fn limit_order(
        &self,
        instrument: &Instrument,
        side: Side,
        price: Price,
        quantity: f64,
        client_order_id: &str,
    ) -> Result<OrderResult> {
        let params = vec![
            ("symbol".to_string(), instrument.symbol()),
            ("side".to_string(), side_str(side).to_string()),
            ("type".to_string(), "LIMIT".to_string()),
            ("timeInForce".to_string(), "GTC".to_string()),
            ("price".to_string(), format_decimal(price.as_f64())),
            ("quantity".to_string(), format_decimal(quantity)),
            ("newClientOrderId".to_string(), client_order_id.to_string()),
            ("newOrderRespType".to_string(), "RESULT".to_string()),
        ];

        self.signed(Method::POST, "/api/v3/order", params).await
    }

    pub async fn market_order(
        &self,
        instrument: &Instrument,
        side: Side,
        quantity: f64,
    ) -> Result<OrderResult> {
        let params = vec![
            ("symbol".to_string(), instrument.symbol()),
            ("side".to_string(), side_str(side).to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), format_decimal(quantity)),
            ("newOrderRespType".to_string(), "RESULT".to_string()),
        ];

        self.signed(Method::POST, "/api/v3/order", params).await
    }

    pub async fn cancel_order(&self, instrument: &Instrument, order_id: &str) -> Result<OrderResult> {
        let params = vec![
            ("symbol".to_string(), instrument.symbol()),
            ("orderId".to_string(), order_id.to_string()),
        ];

        let result: OrderResult = self.signed(Method::DELETE, "/api/v3/order", params).await?;

        tracing::info!(order_id, status = %result.status, "cancel order result");

        Ok(result)
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        uri_path: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{}{}?{}", self.base_url, uri_path, encode_form(params));
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("binance GET {uri_path} failed"))?;

        Self::parse(uri_path, resp).await
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        uri_path: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<T> {
        params.push(("recvWindow".to_string(), RECV_WINDOW_MS.to_string()));
        params.push((
            "timestamp".to_string(),
            chrono::Utc::now().timestamp_millis().to_string(),
        ));

        let query = encode_form(&params);
        let signature = sign(&self.api_secret, &query)?;
        let url = format!("{}{}?{}&signature={}", self.base_url, uri_path, query, signature);

        let resp = self
            .http
            .request(method.clone(), url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .with_context(|| format!("binance {method} {uri_path} failed"))?;

        Self::parse(uri_path, resp).await
    }

    async fn parse<T: DeserializeOwned>(uri_path: &str, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let text = resp.text().await.context("read response body failed")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiError>(&text) {
                bail!("binance api error {} on {uri_path}: {}", error.code, error.msg);
            }
            bail!("binance http error {status} on {uri_path}: {text}");
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, %text, "failed to parse binance JSON response");
            anyhow!("parse binance response failed: {e}; raw={text}")
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    #[serde(deserialize_with = "de_f64")]
    pub last_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub bid_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub ask_price: f64,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        #[serde(deserialize_with = "de_f64")]
        min_qty: f64,
        #[serde(deserialize_with = "de_f64")]
        step_size: f64,
    },
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    PriceFilter {
        #[serde(deserialize_with = "de_f64")]
        tick_size: f64,
    },
    #[serde(rename = "NOTIONAL", alias = "MIN_NOTIONAL", rename_all = "camelCase")]
    Notional {
        #[serde(deserialize_with = "de_f64")]
        min_notional: f64,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    #[serde(deserialize_with = "de_f64")]
    pub free: f64,
    #[serde(deserialize_with = "de_f64")]
    pub locked: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_id: u64,
    pub side: String,
    pub status: String,
    #[serde(deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub orig_qty: f64,
    #[serde(deserialize_with = "de_f64")]
    pub executed_qty: f64,
    #[serde(deserialize_with = "de_f64")]
    pub cummulative_quote_qty: f64,
}

fn de_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn sign(secret: &str, query: &str) -> Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| anyhow!("invalid HMAC key"))?;
    mac.update(query.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    }
}

fn encode_form(params: &[(String, String)]) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    for (k, v) in params {
        ser.append_pair(k, v);
    }
    ser.finish()
}

fn format_decimal(value: f64) -> String {
    format!("{:.8}", value)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
