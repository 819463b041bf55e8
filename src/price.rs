//! Exchange rate snapshot and the ticker that supplies it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_TICKER_URL: &str = "https://api.kraken.com/0/public/Ticker";
pub const DEFAULT_TICKER_PAIR: &str = "SCEUR";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fiat value of one coin, valid for a single run.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ExchangeRate(f64);

impl ExchangeRate {
    pub fn new(fiat_per_coin: f64) -> Result<Self> {
        if fiat_per_coin.is_finite() && fiat_per_coin > 0.0 {
            Ok(Self(fiat_per_coin))
        } else {
            Err(Error::InvalidPrice(fiat_per_coin.to_string()))
        }
    }

    pub fn fiat_per_coin(self) -> f64 {
        self.0
    }
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_rate(&self) -> Result<ExchangeRate>;
}

/// Ticker fields for one trading pair. Arrays hold `[today, last 24 hours]`
/// unless noted.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerInfo {
    /// price, whole lot volume, lot volume
    #[serde(rename = "a", default)]
    pub ask: Vec<String>,
    /// price, whole lot volume, lot volume
    #[serde(rename = "b", default)]
    pub bid: Vec<String>,
    /// price, lot volume
    #[serde(rename = "c", default)]
    pub closed: Vec<String>,
    #[serde(rename = "v", default)]
    pub volume: Vec<String>,
    #[serde(rename = "p", default)]
    pub weighted_average_price: Vec<String>,
    #[serde(rename = "t", default)]
    pub total_trades: Vec<f64>,
    #[serde(rename = "l", default)]
    pub low: Vec<String>,
    #[serde(rename = "h", default)]
    pub high: Vec<String>,
    #[serde(rename = "o", default)]
    pub opening: Option<String>,
}

impl TickerInfo {
    pub fn low_24h(&self) -> Result<f64> {
        let raw = self
            .low
            .get(1)
            .ok_or_else(|| Error::Ticker("ticker has no 24h low".into()))?;
        raw.parse::<f64>()
            .map_err(|e| Error::Parse(format!("24h low {:?}: {}", raw, e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerResponse {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: HashMap<String, TickerInfo>,
}

impl TickerResponse {
    /// Exchanges sometimes answer with an aliased pair name, so a lone entry
    /// is accepted whatever its key.
    ///
    /// Entries of the `error` array prefixed with `W` are warnings and only
    /// logged; anything else fails the lookup.
    pub fn pair(&self, pair: &str) -> Result<&TickerInfo> {
        let (warnings, errors): (Vec<&String>, Vec<&String>) =
            self.error.iter().partition(|entry| entry.starts_with('W'));
        for warning in warnings {
            tracing::warn!(pair, "ticker warning: {}", warning);
        }
        if !errors.is_empty() {
            let errors: Vec<&str> = errors.into_iter().map(String::as_str).collect();
            return Err(Error::Ticker(errors.join("; ")));
        }
        if let Some(info) = self.result.get(pair) {
            return Ok(info);
        }
        if self.result.len() == 1
            && let Some(info) = self.result.values().next()
        {
            return Ok(info);
        }
        Err(Error::Ticker(format!("pair {} missing from response", pair)))
    }
}

/// Public Kraken ticker client.
#[derive(Debug, Clone)]
pub struct KrakenTicker {
    http: reqwest::Client,
    url: String,
    pair: String,
}

impl KrakenTicker {
    pub fn new(url: impl Into<String>, pair: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(Error::Network)?;
        Ok(Self::with_http(http, url, pair))
    }

    pub fn with_http(http: reqwest::Client, url: impl Into<String>, pair: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            pair: pair.into(),
        }
    }

    fn request_url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("invalid ticker url {}: {}", self.url, e)))?;
        url.query_pairs_mut().append_pair("pair", &self.pair);
        Ok(url)
    }

    pub async fn ticker(&self) -> Result<TickerResponse> {
        let response = self
            .http
            .get(self.request_url()?)
            .send()
            .await
            .map_err(Error::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
                status: Some(status.as_u16()),
            });
        }

        let body = response.bytes().await.map_err(Error::Network)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl PriceOracle for KrakenTicker {
    fn name(&self) -> &str {
        "kraken"
    }

    async fn fetch_rate(&self) -> Result<ExchangeRate> {
        let ticker = self.ticker().await?;
        let low = ticker.pair(&self.pair)?.low_24h()?;
        tracing::debug!(pair = %self.pair, low_24h = low, "fetched ticker");
        ExchangeRate::new(low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "error": [],
        "result": {
            "SCEUR": {
                "a": ["0.00321000", "1200", "1200.000"],
                "b": ["0.00320000", "5000", "5000.000"],
                "c": ["0.00320500", "100.0"],
                "v": ["1000000.0", "2500000.0"],
                "p": ["0.00322", "0.00319"],
                "t": [120, 340],
                "l": ["0.00318000", "0.00310000"],
                "h": ["0.00330000", "0.00335000"],
                "o": "0.00325000"
            }
        }
    }"#;

    #[test]
    fn test_exchange_rate_validation() {
        assert!(ExchangeRate::new(0.004).is_ok());
        assert!(ExchangeRate::new(0.0).is_err());
        assert!(ExchangeRate::new(-1.0).is_err());
        assert!(ExchangeRate::new(f64::NAN).is_err());
        assert!(ExchangeRate::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_ticker_uses_24h_low() {
        let ticker: TickerResponse = serde_json::from_str(SAMPLE).unwrap();
        let info = ticker.pair("SCEUR").unwrap();
        assert_eq!(info.total_trades, vec![120.0, 340.0]);
        assert!((info.low_24h().unwrap() - 0.0031).abs() < 1e-12);
    }

    #[test]
    fn test_ticker_error_array() {
        let ticker: TickerResponse =
            serde_json::from_str(r#"{"error":["EQuery:Unknown asset pair"],"result":{}}"#).unwrap();
        let err = ticker.pair("SCEUR").unwrap_err();
        assert!(err.to_string().contains("Unknown asset pair"));
    }

    #[test]
    fn test_ticker_warning_is_not_fatal() {
        let ticker: TickerResponse = serde_json::from_str(
            r#"{"error":["WGeneral:Data may be stale"],"result":{"SCEUR":{"l":["0.004","0.003"]}}}"#,
        )
        .unwrap();
        let info = ticker.pair("SCEUR").unwrap();
        assert!((info.low_24h().unwrap() - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_ticker_error_among_warnings() {
        let ticker: TickerResponse = serde_json::from_str(
            r#"{"error":["WGeneral:Data may be stale","EService:Unavailable"],"result":{"SCEUR":{"l":["0.004","0.003"]}}}"#,
        )
        .unwrap();
        let err = ticker.pair("SCEUR").unwrap_err();
        assert!(err.to_string().contains("EService:Unavailable"));
        assert!(!err.to_string().contains("stale"));
    }

    #[test]
    fn test_ticker_fractional_trade_count() {
        let ticker: TickerResponse = serde_json::from_str(
            r#"{"error":[],"result":{"SCEUR":{"t":[12.5,40],"l":["0.004","0.003"]}}}"#,
        )
        .unwrap();
        let info = ticker.pair("SCEUR").unwrap();
        assert_eq!(info.total_trades, vec![12.5, 40.0]);
    }

    #[test]
    fn test_ticker_aliased_pair() {
        let json = SAMPLE.replace("\"SCEUR\"", "\"XSCZEUR\"");
        let ticker: TickerResponse = serde_json::from_str(&json).unwrap();
        assert!(ticker.pair("SCEUR").is_ok());
    }

    #[test]
    fn test_ticker_bad_low() {
        let info = TickerInfo {
            ask: vec![],
            bid: vec![],
            closed: vec![],
            volume: vec![],
            weighted_average_price: vec![],
            total_trades: vec![],
            low: vec!["0.1".into(), "abc".into()],
            high: vec![],
            opening: None,
        };
        assert!(matches!(info.low_24h(), Err(Error::Parse(_))));
    }

    #[test]
    fn test_request_url_carries_pair() {
        let ticker = KrakenTicker::new(DEFAULT_TICKER_URL, "SCUSD").unwrap();
        let url = ticker.request_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.kraken.com/0/public/Ticker?pair=SCUSD"
        );
    }
}
