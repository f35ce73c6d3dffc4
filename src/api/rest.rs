use crate::api::error::ApiError;
use crate::api::rpc::ops_router;
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::fetch::FetchContext;
use crate::gateway::Aggregator;
use crate::observability::metrics::{GATEWAY_LATENCY, GATEWAY_REQUESTS};
use crate::types::RankedQuote;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub struct GatewayState {
    pub aggregator: Aggregator,
    pub default_limit: usize,
    pub request_timeout: Duration,
    /// Column name for the price field, e.g. "Price USD".
    pub price_column: String,
}

impl GatewayState {
    pub fn new(aggregator: Aggregator, config: &GatewayConfig, currency: &str) -> Self {
        GatewayState {
            aggregator,
            default_limit: config.default_limit,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            price_column: format!("Price {}", currency),
        }
    }
}

pub fn create_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/", get(top_list))
        .with_state(state)
        .merge(ops_router())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Default, Deserialize)]
struct TopListParams {
    limit: Option<String>,
    format: Option<String>,
}

async fn top_list(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<TopListParams>,
) -> Response {
    let timer = GATEWAY_LATENCY.start_timer();
    let response = match render_top_list(&state, params).await {
        Ok(response) => response,
        Err(e) => ApiError(e).into_response(),
    };
    timer.observe_duration();

    GATEWAY_REQUESTS
        .with_label_values(&[response.status().as_str()])
        .inc();
    response
}

async fn render_top_list(state: &GatewayState, params: TopListParams) -> Result<Response> {
    let limit = parse_limit(params.limit.as_deref(), state.default_limit)?;
    let ctx = FetchContext::new().with_timeout(state.request_timeout);
    let list = state.aggregator.build_top_list(limit, &ctx).await?;

    let response = match params.format.as_deref() {
        Some("csv") => (
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            to_csv(&list, &state.price_column),
        )
            .into_response(),
        _ => {
            let rows: Vec<Row<'_>> = list
                .iter()
                .map(|quote| Row { quote, price_column: &state.price_column })
                .collect();
            Json(rows).into_response()
        }
    };
    Ok(response)
}

/// Missing means the default; anything that is not a non-negative integer is rejected.
fn parse_limit(raw: Option<&str>, default: usize) -> Result<usize> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::InvalidLimit(value.to_string())),
    }
}

struct Row<'a> {
    quote: &'a RankedQuote,
    price_column: &'a str,
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("Rank", &self.quote.rank)?;
        map.serialize_entry("Symbol", &self.quote.symbol)?;
        map.serialize_entry(self.price_column, &self.quote.price)?;
        map.end()
    }
}

fn to_csv(list: &[RankedQuote], price_column: &str) -> String {
    let mut out = format!("Rank,Symbol,{}\n", price_column);
    for quote in list {
        out.push_str(&format!("{},{},{}\n", quote.rank, quote.symbol, quote.price));
    }
    out
}
