use crate::error::{Error, Result};
use crate::fetch::FetchContext;
use crate::observability::tracing::trace_top_list;
use crate::services::{PriceRequest, PriceService, RankRequest, RankService};
use crate::types::RankedQuote;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

/// Joins one rank fetch and one price fetch into the gateway's top list.
pub struct Aggregator {
    ranks: Arc<dyn RankService>,
    prices: Arc<dyn PriceService>,
    surplus: usize,
}

impl Aggregator {
    pub fn new(ranks: Arc<dyn RankService>, prices: Arc<dyn PriceService>, surplus: usize) -> Self {
        Aggregator {
            ranks,
            prices,
            surplus,
        }
    }

    pub async fn build_top_list(&self, limit: usize, ctx: &FetchContext) -> Result<Vec<RankedQuote>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.fetch_and_join(limit, ctx)
            .instrument(trace_top_list(limit))
            .await
    }

    async fn fetch_and_join(&self, limit: usize, ctx: &FetchContext) -> Result<Vec<RankedQuote>> {
        // Step 1: rank list, with room for coins that turn out unpriced
        let wanted = i32::try_from(limit.saturating_add(self.surplus))
            .map_err(|_| Error::InvalidLimit(limit.to_string()))?;
        let ranks = self.ranks.get_ranks(RankRequest { limit: wanted }, ctx.clone()).await?;

        // Step 2: prices for exactly those symbols
        let prices = self
            .prices
            .get_prices(PriceRequest { symbols: ranks.symbols.clone() }, ctx.clone())
            .await?;

        // Step 3: join in rank order
        Ok(join_ranked(ranks.symbols, &prices.prices, limit, self.surplus > 0))
    }
}

/// Numbers `symbols` 1..N in order and attaches prices, cutting at `limit`.
/// Unpriced symbols get price 0, or are skipped when `skip_unpriced` is set
/// so the surplus can fill their place.
pub fn join_ranked(
    symbols: Vec<String>,
    prices: &HashMap<String, f64>,
    limit: usize,
    skip_unpriced: bool,
) -> Vec<RankedQuote> {
    symbols
        .into_iter()
        .filter_map(|symbol| match prices.get(&symbol) {
            Some(price) => Some((symbol, *price)),
            None if skip_unpriced => None,
            None => Some((symbol, 0.0)),
        })
        .take(limit)
        .enumerate()
        .map(|(i, (symbol, price))| RankedQuote {
            rank: i + 1,
            symbol,
            price,
        })
        .collect()
}
