use serde::{Deserialize, Serialize};

pub mod request;
pub mod provider;
pub mod server;
pub mod loader;

pub use loader::AppConfig;
pub use provider::{ProviderConfig, RankConfig, RankStrategy};
pub use request::{RequestConfig, RetryPolicy};
pub use server::{GatewayConfig, ServiceConfig};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}
