use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use topcoins::api::price_router;
use topcoins::config::AppConfig;
use topcoins::fetch::FetchStack;
use topcoins::observability::{metrics, tracing as telemetry};
use topcoins::provider::CryptoCompare;
use topcoins::services::PriceCollector;
use topcoins::utils::shutdown_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_from_env().context("loading configuration")?;
    telemetry::init(&config.logging);
    metrics::register_metrics();

    let provider = Arc::new(CryptoCompare::new(&config.provider));
    let stack = FetchStack::from_config(&config)?;
    let collector = PriceCollector::new(provider, stack);

    let addr = &config.price_service.listen_addr;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Price collector listening on {}", addr);

    axum::serve(listener, price_router(Arc::new(collector)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Price collector stopped");
    Ok(())
}
