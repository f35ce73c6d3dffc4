use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::fetch::RequestSpec;
use crate::types::Quote;
use reqwest::Url;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::HashMap;

/// Largest page the top-list endpoint serves.
pub const TOPLIST_PAGE_SIZE: usize = 100;

/// Request builder and response decoder for the CryptoCompare `min-api`.
pub struct CryptoCompare {
    api_url: String,
    api_key: String,
    currency: String,
}

impl CryptoCompare {
    pub fn new(config: &ProviderConfig) -> Self {
        CryptoCompare {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            currency: config.quote_currency.clone(),
        }
    }

    // {"BTC":{"USD":68025.43},"ETH":{"USD":3274.18}}
    pub fn price_multi(&self, symbols: &[String]) -> Result<RequestSpec> {
        self.request("pricemulti", &[("fsyms", symbols.join(",")), ("tsyms", self.currency.clone())])
    }

    // {"RAW":{"BTC":{"USD":{"PRICE":..,"MKTCAP":..}}},"DISPLAY":{..}}
    pub fn price_multi_full(&self, symbols: &[String]) -> Result<RequestSpec> {
        self.request("pricemultifull", &[("fsyms", symbols.join(",")), ("tsyms", self.currency.clone())])
    }

    // {"Response":"Success","Data":{"BTC":{..},"ETH":{..}}}
    pub fn coin_list(&self) -> Result<RequestSpec> {
        self.request("blockchain/list", &[])
    }

    // {"Message":"Success","Data":[{"CoinInfo":{"Name":"BTC"}},..]}
    pub fn top_by_market_cap(&self, page: usize) -> Result<RequestSpec> {
        self.request(
            "top/mktcapfull",
            &[
                ("limit", TOPLIST_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
                ("tsym", self.currency.clone()),
            ],
        )
    }

    fn request(&self, path: &str, params: &[(&str, String)]) -> Result<RequestSpec> {
        let base = format!("{}/{}", self.api_url, path);
        let url = if params.is_empty() {
            Url::parse(&base)
        } else {
            Url::parse_with_params(&base, params.iter().map(|(k, v)| (*k, v.as_str())))
        }
        .map_err(|e| Error::ConfigError(format!("invalid provider url {}: {}", base, e)))?;

        let spec = RequestSpec::get(url.to_string());
        if self.api_key.is_empty() {
            Ok(spec)
        } else {
            Ok(spec.header("authorization", format!("Apikey {}", self.api_key)))
        }
    }

    pub fn decode_prices(&self, raw: &[u8]) -> Result<HashMap<String, Quote>> {
        check_envelope(raw)?;

        let coins: HashMap<String, HashMap<String, f64>> = serde_json::from_slice(raw)?;
        Ok(coins
            .into_iter()
            .filter_map(|(symbol, quotes)| {
                let price = *quotes.get(&self.currency)?;
                Some((symbol.clone(), Quote::new(symbol, price)))
            })
            .collect())
    }

    pub fn decode_market_caps(&self, raw: &[u8]) -> Result<HashMap<String, f64>> {
        check_envelope(raw)?;

        let full: FullQuoteResponse = serde_json::from_slice(raw)?;
        Ok(full
            .raw
            .into_iter()
            .filter_map(|(symbol, mut quotes)| {
                let cap = quotes.remove(&self.currency)?.market_cap?;
                Some((symbol, cap))
            })
            .collect())
    }

    /// Coin universe, sorted so ranking ties resolve the same way every time.
    pub fn decode_coin_list(&self, raw: &[u8]) -> Result<Vec<String>> {
        check_envelope(raw)?;

        let list: CoinListResponse = serde_json::from_slice(raw)?;
        let mut names: Vec<String> = list.data.into_keys().collect();
        names.sort();
        Ok(names)
    }

    /// Symbols in provider rank order.
    pub fn decode_top_list(&self, raw: &[u8]) -> Result<Vec<String>> {
        check_envelope(raw)?;

        let top: TopListResponse = serde_json::from_slice(raw)?;
        Ok(top.data.into_iter().map(|entry| entry.coin_info.name).collect())
    }
}

/// Rejects the provider's error envelope. Success payloads of some endpoints
/// carry no `Response` field at all, so only a present, non-success value fails.
fn check_envelope(raw: &[u8]) -> Result<()> {
    let envelope: Envelope = serde_json::from_slice(raw)?;
    match envelope.response.as_deref() {
        None | Some("Success") => Ok(()),
        Some(status) => Err(Error::UpstreamError(
            envelope.message.unwrap_or_else(|| format!("response status {}", status)),
        )),
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Deserialize)]
struct FullQuoteResponse {
    #[serde(rename = "RAW", default)]
    raw: HashMap<String, HashMap<String, RawQuote>>,
}

#[derive(Deserialize)]
struct RawQuote {
    #[serde(rename = "MKTCAP")]
    market_cap: Option<f64>,
}

#[derive(Deserialize)]
struct CoinListResponse {
    #[serde(rename = "Data", default)]
    data: HashMap<String, IgnoredAny>,
}

#[derive(Deserialize)]
struct TopListResponse {
    #[serde(rename = "Data", default)]
    data: Vec<TopListEntry>,
}

#[derive(Deserialize)]
struct TopListEntry {
    #[serde(rename = "CoinInfo")]
    coin_info: CoinInfo,
}

#[derive(Deserialize)]
struct CoinInfo {
    #[serde(rename = "Name")]
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> CryptoCompare {
        CryptoCompare::new(&ProviderConfig {
            api_url: "https://min-api.example.test/data/".to_string(),
            api_key: "secret".to_string(),
            ..ProviderConfig::default()
        })
    }

    #[test]
    fn price_request_keeps_key_out_of_url() {
        let spec = provider()
            .price_multi(&["BTC".to_string(), "ETH".to_string()])
            .unwrap();

        assert!(spec.url.starts_with("https://min-api.example.test/data/pricemulti?"));
        assert!(spec.url.contains("fsyms=BTC%2CETH"));
        assert!(spec.url.contains("tsyms=USD"));
        assert!(!spec.url.contains("secret"));
        assert_eq!(spec.headers, vec![("authorization".to_string(), "Apikey secret".to_string())]);
    }

    #[test]
    fn decodes_price_payload() {
        let raw = br#"{"BTC":{"USD":68025.43},"ETH":{"USD":3274.18},"DOGE":{"USD":0.1313}}"#;
        let prices = provider().decode_prices(raw).unwrap();

        assert_eq!(prices.len(), 3);
        assert_eq!(prices["ETH"], Quote::new("ETH", 3274.18));
    }

    #[test]
    fn error_envelope_is_an_upstream_error() {
        let raw = br#"{"Response":"Error","Message":"fsyms param is empty","HasWarning":false,"Type":2,"RateLimit":{},"Data":{}}"#;
        let err = provider().decode_prices(raw).unwrap_err();

        assert!(matches!(err, Error::UpstreamError(ref m) if m == "fsyms param is empty"));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = provider().decode_prices(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));
    }

    #[test]
    fn decodes_market_caps_from_raw_section() {
        let raw = br#"{
            "RAW": {
                "BTC": {"USD": {"PRICE": 68000.0, "MKTCAP": 1301943747738.89, "FROMSYMBOL": "BTC"}},
                "ETH": {"USD": {"PRICE": 3200.0, "MKTCAP": 384000000000.0}},
                "ZXC": {"USD": {"PRICE": 0.01}}
            },
            "DISPLAY": {}
        }"#;
        let caps = provider().decode_market_caps(raw).unwrap();

        assert_eq!(caps.len(), 2);
        assert!(caps["BTC"] > caps["ETH"]);
    }

    #[test]
    fn coin_list_is_sorted() {
        let raw = br#"{"Response":"Success","Message":"","Data":{"ETH":{"id":2},"BTC":{"id":1},"ADA":{}}}"#;
        let coins = provider().decode_coin_list(raw).unwrap();
        assert_eq!(coins, vec!["ADA", "BTC", "ETH"]);
    }

    #[test]
    fn coin_list_failure_carries_message() {
        let raw = br#"{"Response":"Error","Message":"You are over your rate limit"}"#;
        assert!(matches!(provider().decode_coin_list(raw), Err(Error::UpstreamError(_))));
    }

    #[test]
    fn top_list_keeps_provider_order() {
        let raw = br#"{"Message":"Success","Type":100,"Data":[
            {"CoinInfo":{"Name":"BTC","FullName":"Bitcoin"},"RAW":{}},
            {"CoinInfo":{"Name":"ETH"}},
            {"CoinInfo":{"Name":"XRP"}}
        ]}"#;
        let symbols = provider().decode_top_list(raw).unwrap();
        assert_eq!(symbols, vec!["BTC", "ETH", "XRP"]);
    }

    #[test]
    fn top_list_request_pages() {
        let spec = provider().top_by_market_cap(2).unwrap();
        assert!(spec.url.contains("top/mktcapfull?limit=100&page=2&tsym=USD"));
    }
}
