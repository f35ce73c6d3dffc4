use crate::config::RankStrategy;
use crate::error::{Error, Result};
use crate::fetch::{FetchContext, Retryer};
use crate::provider::CryptoCompare;
use crate::provider::cryptocompare::TOPLIST_PAGE_SIZE;
use crate::services::{PriceCollector, RankRequest, RankResponse, RankService};
use crate::types::RankedList;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Ranks coins by market capitalization, either through the provider's own
/// top list or by pricing the whole coin universe locally.
pub struct RankCollector {
    provider: Arc<CryptoCompare>,
    retryer: Arc<Retryer>,
    prices: Arc<PriceCollector>,
    strategy: RankStrategy,
}

impl RankCollector {
    pub fn new(
        provider: Arc<CryptoCompare>,
        retryer: Arc<Retryer>,
        prices: Arc<PriceCollector>,
        strategy: RankStrategy,
    ) -> Self {
        RankCollector {
            provider,
            retryer,
            prices,
            strategy,
        }
    }

    pub async fn get_ranked(&self, limit: usize, ctx: &FetchContext) -> Result<RankedList> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let ranked = match self.strategy {
            RankStrategy::Toplist => self.rank_by_toplist(limit, ctx).await?,
            RankStrategy::Universe => self.rank_by_universe(limit, ctx).await?,
        };
        tracing::info!("Ranked {} coins (limit {}, strategy {:?})", ranked.len(), limit, self.strategy);
        Ok(ranked)
    }

    async fn rank_by_toplist(&self, limit: usize, ctx: &FetchContext) -> Result<RankedList> {
        let mut symbols = Vec::with_capacity(limit.min(TOPLIST_PAGE_SIZE));
        let pages = limit.div_ceil(TOPLIST_PAGE_SIZE);

        for page in 0..pages {
            let request = self.provider.top_by_market_cap(page)?;
            let raw = self.retryer.fetch(&request, ctx).await?;
            let chunk = self.provider.decode_top_list(&raw)?;
            let exhausted = chunk.len() < TOPLIST_PAGE_SIZE;
            symbols.extend(chunk);
            if exhausted {
                break;
            }
        }

        let mut ranked = dedup_preserving_order(symbols);
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn rank_by_universe(&self, limit: usize, ctx: &FetchContext) -> Result<RankedList> {
        let request = self.provider.coin_list()?;
        let raw = self.retryer.fetch(&request, ctx).await?;
        let coins = dedup_preserving_order(self.provider.decode_coin_list(&raw)?);

        let caps = self.prices.get_market_caps(&coins, ctx).await?;
        let ranked: Vec<(String, f64)> = coins
            .into_iter()
            .filter_map(|coin| caps.get(&coin).map(|cap| (coin, *cap)))
            .collect();

        Ok(order_by_value(ranked, limit))
    }
}

/// Descending by value, stable on ties, cut to `limit`.
pub fn order_by_value(mut coins: Vec<(String, f64)>, limit: usize) -> RankedList {
    coins.sort_by(|a, b| b.1.total_cmp(&a.1));
    coins.into_iter().take(limit).map(|(symbol, _)| symbol).collect()
}

fn dedup_preserving_order(symbols: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(symbols.len());
    symbols.into_iter().filter(|s| seen.insert(s.clone())).collect()
}

#[async_trait]
impl RankService for RankCollector {
    async fn get_ranks(&self, request: RankRequest, ctx: FetchContext) -> Result<RankResponse> {
        let limit = usize::try_from(request.limit)
            .map_err(|_| Error::InvalidLimit(request.limit.to_string()))?;
        let symbols = self.get_ranked(limit, &ctx).await?;
        Ok(RankResponse { symbols })
    }
}
