use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use topcoins::api::rank_router;
use topcoins::config::AppConfig;
use topcoins::fetch::FetchStack;
use topcoins::observability::{metrics, tracing as telemetry};
use topcoins::provider::CryptoCompare;
use topcoins::services::{PriceCollector, RankCollector};
use topcoins::utils::shutdown_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_from_env().context("loading configuration")?;
    telemetry::init(&config.logging);
    metrics::register_metrics();

    let provider = Arc::new(CryptoCompare::new(&config.provider));
    let stack = FetchStack::from_config(&config)?;
    let retryer = stack.retryer.clone();
    let prices = Arc::new(PriceCollector::new(provider.clone(), stack));
    let collector = RankCollector::new(provider, retryer, prices, config.rank.strategy);

    let addr = &config.rank_service.listen_addr;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Rank collector listening on {} (strategy: {:?})", addr, config.rank.strategy);

    axum::serve(listener, rank_router(Arc::new(collector)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Rank collector stopped");
    Ok(())
}
