pub mod price_collector;
pub mod rank_collector;
pub mod remote;

pub use price_collector::PriceCollector;
pub use rank_collector::RankCollector;
pub use remote::{RemotePriceService, RemoteRankService};

use crate::error::Result;
use crate::fetch::FetchContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankRequest {
    pub limit: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankResponse {
    pub symbols: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRequest {
    pub symbols: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub prices: HashMap<String, f64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RankService: Send + Sync {
    async fn get_ranks(&self, request: RankRequest, ctx: FetchContext) -> Result<RankResponse>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceService: Send + Sync {
    async fn get_prices(&self, request: PriceRequest, ctx: FetchContext) -> Result<PriceResponse>;
}
