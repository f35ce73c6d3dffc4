pub mod context;
pub mod rate_limit;
pub mod transport;
pub mod retryer;
pub mod batch;
pub mod fan_out;

pub use context::FetchContext;
pub use fan_out::FanOutExecutor;
pub use rate_limit::RateLimitCache;
pub use retryer::Retryer;
pub use transport::{HttpTransport, RequestSpec, Transport};

use crate::config::AppConfig;
use crate::error::Result;
use std::sync::Arc;

/// Retryer and executor shared by every collector in one process.
#[derive(Clone)]
pub struct FetchStack {
    pub retryer: Arc<Retryer>,
    pub executor: FanOutExecutor,
    pub batch_size: usize,
}

impl FetchStack {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: &AppConfig, transport: Arc<dyn Transport>) -> Self {
        let policy = Arc::new(config.request.retry_policy());
        let retryer = Retryer::with_policy(policy, config.request.rate_limit_cache_capacity, transport);

        FetchStack {
            retryer: Arc::new(retryer),
            executor: FanOutExecutor::with_in_flight_limit(config.provider.max_in_flight),
            batch_size: config.provider.batch_size,
        }
    }
}
