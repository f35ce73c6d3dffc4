use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen_addr: String,
    pub price_service_url: String,
    pub rank_service_url: String,
    /// Extra symbols requested from the rank service to cover coins that fail to price.
    pub rank_surplus: usize,
    pub default_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            listen_addr: "0.0.0.0:8080".to_string(),
            price_service_url: "http://127.0.0.1:50051".to_string(),
            rank_service_url: "http://127.0.0.1:50052".to_string(),
            rank_surplus: 0,
            default_limit: 100,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub listen_addr: String,
}

impl ServiceConfig {
    pub fn price_default() -> Self {
        ServiceConfig { listen_addr: "0.0.0.0:50051".to_string() }
    }

    pub fn rank_default() -> Self {
        ServiceConfig { listen_addr: "0.0.0.0:50052".to_string() }
    }
}
