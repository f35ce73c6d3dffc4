use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_url: String,
    pub api_key: String,
    pub quote_currency: String,
    /// Longest symbol list the provider accepts in one request (found empirically).
    pub batch_size: usize,
    /// Upper bound on batch requests in flight across the whole process.
    pub max_in_flight: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            api_url: "https://min-api.cryptocompare.com/data".to_string(),
            api_key: String::new(),
            quote_currency: "USD".to_string(),
            batch_size: 60,
            max_in_flight: 16,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RankStrategy {
    /// Provider's own top list, already ordered by market cap.
    #[default]
    Toplist,
    /// Full coin universe, ranked locally by market cap.
    Universe,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RankConfig {
    pub strategy: RankStrategy,
}
