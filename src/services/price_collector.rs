use crate::error::Result;
use crate::fetch::{FetchContext, FetchStack};
use crate::provider::CryptoCompare;
use crate::services::{PriceRequest, PriceResponse, PriceService};
use crate::types::Quote;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

pub struct PriceCollector {
    provider: Arc<CryptoCompare>,
    stack: FetchStack,
}

impl PriceCollector {
    pub fn new(provider: Arc<CryptoCompare>, stack: FetchStack) -> Self {
        PriceCollector { provider, stack }
    }

    pub async fn get_prices(&self, symbols: &[String], ctx: &FetchContext) -> Result<HashMap<String, Quote>> {
        let started = Instant::now();
        let provider = self.provider.clone();
        let retryer = self.stack.retryer.clone();
        let decoder = self.provider.clone();

        let result = self
            .stack
            .executor
            .fetch_all(
                symbols,
                self.stack.batch_size,
                ctx,
                move |batch, ctx| {
                    let provider = provider.clone();
                    let retryer = retryer.clone();
                    async move {
                        let request = provider.price_multi(&batch)?;
                        retryer.fetch(&request, &ctx).await
                    }
                },
                move |raw: &[u8]| decoder.decode_prices(raw),
            )
            .await;

        match &result {
            Ok(prices) => tracing::info!(
                "Prices requested for {} symbols, got {} in {:?}",
                symbols.len(),
                prices.len(),
                started.elapsed()
            ),
            Err(e) => tracing::warn!("Price request for {} symbols failed: {}", symbols.len(), e),
        }
        result
    }

    /// Market capitalization per symbol, the metric the rank collector orders by.
    pub async fn get_market_caps(&self, symbols: &[String], ctx: &FetchContext) -> Result<HashMap<String, f64>> {
        let provider = self.provider.clone();
        let retryer = self.stack.retryer.clone();
        let decoder = self.provider.clone();

        self.stack
            .executor
            .fetch_all(
                symbols,
                self.stack.batch_size,
                ctx,
                move |batch, ctx| {
                    let provider = provider.clone();
                    let retryer = retryer.clone();
                    async move {
                        let request = provider.price_multi_full(&batch)?;
                        retryer.fetch(&request, &ctx).await
                    }
                },
                move |raw: &[u8]| decoder.decode_market_caps(raw),
            )
            .await
    }
}

#[async_trait]
impl PriceService for PriceCollector {
    async fn get_prices(&self, request: PriceRequest, ctx: FetchContext) -> Result<PriceResponse> {
        let quotes = PriceCollector::get_prices(self, &request.symbols, &ctx).await?;
        let prices = quotes
            .into_values()
            .map(|quote| (quote.symbol, quote.price))
            .collect();
        Ok(PriceResponse { prices })
    }
}
