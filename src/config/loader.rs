use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub rank: RankConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default = "ServiceConfig::price_default")]
    pub price_service: ServiceConfig,
    #[serde(default = "ServiceConfig::rank_default")]
    pub rank_service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            request: RequestConfig::default(),
            provider: ProviderConfig::default(),
            rank: RankConfig::default(),
            gateway: GatewayConfig::default(),
            price_service: ServiceConfig::price_default(),
            rank_service: ServiceConfig::rank_default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layers `config/default`, `config/<env>` and `TOPCOINS_*` variables.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("TOPCOINS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    /// Picks the environment from `TOPCOINS_ENV`, falling back to `development`.
    pub fn load_from_env() -> Result<Self> {
        let env = std::env::var("TOPCOINS_ENV").unwrap_or_else(|_| "development".to_string());
        Self::load(&env)
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.batch_size == 0 {
            return Err(Error::ConfigError("provider.batch_size must be positive".to_string()));
        }
        if self.provider.max_in_flight == 0 {
            return Err(Error::ConfigError("provider.max_in_flight must be positive".to_string()));
        }
        if self.request.timeout_secs == 0 {
            return Err(Error::ConfigError("request.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
