use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use topcoins::api::{GatewayState, create_router};
use topcoins::config::AppConfig;
use topcoins::gateway::Aggregator;
use topcoins::observability::{metrics, tracing as telemetry};
use topcoins::services::{RemotePriceService, RemoteRankService};
use topcoins::utils::shutdown_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_from_env().context("loading configuration")?;
    telemetry::init(&config.logging);
    metrics::register_metrics();

    let ranks = RemoteRankService::new(&config.gateway.rank_service_url)?;
    let prices = RemotePriceService::new(&config.gateway.price_service_url)?;
    let aggregator = Aggregator::new(Arc::new(ranks), Arc::new(prices), config.gateway.rank_surplus);
    let state = GatewayState::new(aggregator, &config.gateway, &config.provider.quote_currency);

    let listener = TcpListener::bind(&config.gateway.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.gateway.listen_addr))?;
    tracing::info!(
        "Gateway listening on {} (ranks: {}, prices: {})",
        config.gateway.listen_addr,
        config.gateway.rank_service_url,
        config.gateway.price_service_url,
    );

    axum::serve(listener, create_router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}
